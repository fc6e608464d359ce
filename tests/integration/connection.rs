use std::{rc::Rc, time::Duration};

use conclave::{
    conf,
    engine::{ConnectionEvent, ConnectionQualityEvent},
    Client, Conf, ConnectionState,
};
use futures::StreamExt as _;
use tokio::time;

use crate::{engine::FakeEngine, local, settle};

fn client() -> (Rc<FakeEngine>, Client) {
    let engine = Rc::new(FakeEngine::default());
    let client = Client::new(engine.clone(), Conf::default()).unwrap();
    (engine, client)
}

#[tokio::test(start_paused = true)]
async fn requires_config() {
    local(async {
        let (engine, client) = client();

        let err = client.connect(None, None).unwrap_err();

        assert_eq!(
            err.into_inner().to_string(),
            "Connection configuration is required",
        );
        assert!(engine.connections.borrow().is_empty());
        assert!(client.connection().is_none());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn starts_connecting_with_room_hint() {
    local(async {
        let (engine, client) = client();

        let connection = client.connect_default(Some("lobby")).unwrap();
        let fake = engine.connection();

        assert_eq!(connection.state(), ConnectionState::Connecting);
        assert_eq!(fake.connect_calls.get(), 1);
        assert!(fake.config.service_url.ends_with("?room=lobby"));
        assert!(fake
            .config
            .websocket
            .as_deref()
            .unwrap()
            .ends_with("?room=lobby"));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn exposes_live_connection_only_when_connected() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();
        assert!(connection.live().is_none());

        fake.listeners.emit(ConnectionEvent::Established);
        assert_eq!(connection.state(), ConnectionState::Connected);
        assert!(connection.live().is_some());

        fake.listeners.emit(ConnectionEvent::Failed);
        assert_eq!(connection.state(), ConnectionState::Failed);
        assert!(connection.live().is_none());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn live_connection_changes_before_state() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();

        let observer = connection.clone();
        let mut states = connection.on_state_change();
        assert_eq!(states.next().await, Some(ConnectionState::Connecting));

        fake.listeners.emit(ConnectionEvent::Established);
        assert_eq!(states.next().await, Some(ConnectionState::Connected));
        assert!(observer.live().is_some());

        fake.listeners.emit(ConnectionEvent::Disconnected);
        assert_eq!(states.next().await, Some(ConnectionState::Disconnected));
        assert!(observer.live().is_none());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn disconnected_detaches_listeners() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();
        fake.listeners.emit(ConnectionEvent::Established);
        assert!(!fake.listeners.is_empty());

        fake.listeners.emit(ConnectionEvent::Disconnected);

        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(fake.listeners.is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn wrong_state_fails_without_retry() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();

        fake.listeners.emit(ConnectionEvent::WrongState);

        assert_eq!(connection.state(), ConnectionState::Failed);
        assert_eq!(fake.connect_calls.get(), 1);
        assert_eq!(engine.connections.borrow().len(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn tracks_connection_quality() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();

        engine.connection().listeners.emit(
            ConnectionQualityEvent::LocalStatsUpdated {
                connection_quality: 87.5,
            },
        );

        assert!((connection.quality() - 87.5).abs() < f64::EPSILON);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_detaches_listeners_after_timeout() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();
        fake.listeners.emit(ConnectionEvent::Established);

        connection.disconnect();
        assert_eq!(connection.state(), ConnectionState::Disconnecting);
        assert!(connection.live().is_none());
        assert_eq!(fake.disconnect_calls.get(), 1);

        time::sleep(Duration::from_millis(3999)).await;
        assert!(!fake.listeners.is_empty());

        time::sleep(Duration::from_millis(2)).await;
        assert!(fake.listeners.is_empty());
        assert_eq!(connection.state(), ConnectionState::Disconnecting);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_of_inactive_connection_detaches_immediately() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let fake = engine.connection();
        fake.listeners.emit(ConnectionEvent::Failed);

        connection.disconnect();

        assert!(fake.listeners.is_empty());
        assert_eq!(fake.disconnect_calls.get(), 0);
        assert_eq!(connection.state(), ConnectionState::Failed);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn ignores_events_of_superseded_connection() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();
        let first = engine.connection();
        first.listeners.emit(ConnectionEvent::Established);

        connection.reconfigure(Some(conf::Connection::default()));
        let second = engine.connection();
        assert_eq!(first.disconnect_calls.get(), 1);
        assert_eq!(second.connect_calls.get(), 1);
        assert_eq!(connection.state(), ConnectionState::Connecting);

        first.listeners.emit(ConnectionEvent::Established);
        assert_eq!(connection.state(), ConnectionState::Connecting);

        first.listeners.emit(ConnectionEvent::Disconnected);
        assert!(first.listeners.is_empty());
        assert_eq!(connection.state(), ConnectionState::Connecting);

        second.listeners.emit(ConnectionEvent::Established);
        assert_eq!(connection.state(), ConnectionState::Connected);

        settle().await;
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn reconfigure_without_config_only_disconnects() {
    local(async {
        let (engine, client) = client();
        let connection = client.connect_default(None).unwrap();

        connection.reconfigure(None);

        assert_eq!(connection.state(), ConnectionState::Disconnecting);
        assert_eq!(engine.connections.borrow().len(), 1);
    })
    .await;
}
