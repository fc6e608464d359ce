use std::rc::Rc;

use conclave::{engine::ConnectionEvent, Client, Conf, ConnectionState};

use crate::{engine::FakeEngine, local};

#[tokio::test(start_paused = true)]
async fn initializes_engine_on_creation() {
    let engine = Rc::new(FakeEngine::default());

    let client = Client::new(engine.clone(), Conf::default()).unwrap();

    assert_eq!(engine.init_calls.get(), 1);
    assert!(client.connection().is_none());
    assert_eq!(client.local_tracks().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn new_connection_disconnects_previous_one() {
    local(async {
        let engine = Rc::new(FakeEngine::default());
        let client = Client::new(engine.clone(), Conf::default()).unwrap();

        let first = client.connect_default(None).unwrap();
        engine.connection().listeners.emit(ConnectionEvent::Established);
        let second = client.connect_default(Some("lobby")).unwrap();

        let connections = engine.connections.borrow();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].disconnect_calls.get(), 1);
        assert_eq!(first.state(), ConnectionState::Disconnecting);
        assert_eq!(second.state(), ConnectionState::Connecting);
        assert_eq!(
            client.connection().unwrap().state(),
            ConnectionState::Connecting,
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn missing_config_keeps_current_connection() {
    local(async {
        let engine = Rc::new(FakeEngine::default());
        let client = Client::new(engine.clone(), Conf::default()).unwrap();
        let _connection = client.connect_default(None).unwrap();

        assert!(client.connect(None, None).is_err());

        assert_eq!(engine.connection().disconnect_calls.get(), 0);
        assert!(client.connection().is_some());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn dispose_releases_everything() {
    local(async {
        let engine = Rc::new(FakeEngine::default());
        let client = Client::new(engine.clone(), Conf::default()).unwrap();
        let connection = client.connect_default(None).unwrap();
        assert!(client.local_tracks().request(None, None).await);

        client.dispose().await;

        assert_eq!(connection.state(), ConnectionState::Disconnecting);
        assert!(client.connection().is_none());
        assert_eq!(client.local_tracks().count(), 0);
        assert!(engine.tracks.borrow().iter().all(|t| t.is_disposed()));
    })
    .await;
}
