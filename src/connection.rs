//! Lifecycle of the signaling connection.

use std::{
    cell::{Cell, RefCell},
    fmt,
    ops::Deref,
    rc::{Rc, Weak},
};

use conclave_reactive::ObservableCell;
use derive_more::Display;
use futures::stream::LocalBoxStream;
use tracerr::Traced;

use crate::{
    conf,
    conferences::Conferences,
    engine::{
        ConnectionEvent, ConnectionQualityEvent, EngineConnection,
        EngineEvent, EngineHandle, EventName,
    },
    media::LocalTracks,
    platform,
    utils::{
        ConclaveError, ConfigRequiredError, EventSpec, HandlerDetachedError,
        Wiring,
    },
};

/// State of a [`Connection`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ConnectionState {
    #[display(fmt = "initial")]
    Initial,

    #[display(fmt = "connecting")]
    Connecting,

    #[display(fmt = "connected")]
    Connected,

    #[display(fmt = "disconnecting")]
    Disconnecting,

    #[display(fmt = "disconnected")]
    Disconnected,

    #[display(fmt = "failed")]
    Failed,
}

/// Established [`EngineConnection`].
///
/// Two [`LiveConnection`]s are equal only if they reference the same engine
/// connection.
#[derive(Clone, Debug)]
pub struct LiveConnection(Rc<dyn EngineConnection>);

impl LiveConnection {
    /// Returns the underlying engine connection.
    #[inline]
    pub fn inner(&self) -> &Rc<dyn EngineConnection> {
        &self.0
    }
}

impl PartialEq for LiveConnection {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
    }
}

impl Deref for LiveConnection {
    type Target = dyn EngineConnection;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Engine connection created for a single configuration, along with its
/// listeners.
struct Instance {
    connection: Rc<dyn EngineConnection>,
    wiring: Rc<Wiring<dyn EngineConnection>>,
}

/// Observable signaling connection.
///
/// The live engine connection is exposed via [`Connection::live`] only while
/// the state is [`ConnectionState::Connected`].
#[derive(Clone)]
pub struct Connection(Rc<Inner>);

struct Inner {
    engine: EngineHandle,
    timeouts: conf::Timeouts,
    room_hint: Option<String>,
    state: ObservableCell<ConnectionState>,
    quality: ObservableCell<f64>,
    live: ObservableCell<Option<LiveConnection>>,
    current: RefCell<Option<Instance>>,

    /// Number of the engine connection created last. Events of the older
    /// ones don't affect the state.
    generation: Cell<u64>,

    conferences: Conferences,
}

impl Connection {
    /// Creates a new [`Connection`] and starts connecting with the provided
    /// `config`.
    ///
    /// The `room_hint`, if any, is passed to the server as the `room` query
    /// parameter of the endpoints.
    ///
    /// # Errors
    ///
    /// With [`ConfigRequiredError`] if `config` is `None`.
    pub fn new(
        engine: EngineHandle,
        config: Option<conf::Connection>,
        room_hint: Option<&str>,
        local_tracks: LocalTracks,
        timeouts: conf::Timeouts,
    ) -> Result<Self, Traced<ConfigRequiredError>> {
        let config = config.ok_or_else(|| tracerr::new!(ConfigRequiredError))?;

        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| Inner {
            engine,
            timeouts,
            room_hint: room_hint.map(ToOwned::to_owned),
            state: ObservableCell::new(ConnectionState::Initial),
            quality: ObservableCell::new(0.0),
            live: ObservableCell::new(None),
            current: RefCell::new(None),
            generation: Cell::new(0),
            conferences: Conferences::new(
                WeakConnection(weak.clone()),
                local_tracks,
                timeouts,
            ),
        });
        inner.connect(&config);

        Ok(Self(inner))
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.0.state.get()
    }

    /// Streams the [`ConnectionState`], starting with the current one.
    #[inline]
    pub fn on_state_change(&self) -> LocalBoxStream<'static, ConnectionState> {
        self.0.state.subscribe()
    }

    /// Returns the established engine connection, if any.
    #[inline]
    pub fn live(&self) -> Option<LiveConnection> {
        self.0.live.get()
    }

    /// Streams the established engine connection, starting with the current
    /// one.
    ///
    /// The stream ends once this [`Connection`] is dropped.
    #[inline]
    pub fn on_live_change(
        &self,
    ) -> LocalBoxStream<'static, Option<LiveConnection>> {
        self.0.live.subscribe()
    }

    /// Returns the last connection quality reported by the engine.
    #[inline]
    pub fn quality(&self) -> f64 {
        self.0.quality.get()
    }

    #[inline]
    pub fn on_quality_change(&self) -> LocalBoxStream<'static, f64> {
        self.0.quality.subscribe()
    }

    /// Returns the conferences joined over this [`Connection`].
    #[inline]
    pub fn conferences(&self) -> &Conferences {
        &self.0.conferences
    }

    /// Disconnects from the server.
    ///
    /// Only a connecting or connected [`Connection`] is disconnected:
    /// listeners are detached once the engine confirms the disconnection, or
    /// after [`conf::Timeouts::listeners_cleanup`] at the latest. Otherwise
    /// listeners are detached right away.
    #[inline]
    pub fn disconnect(&self) {
        self.0.teardown();
    }

    /// Tears down the current engine connection and, if a `config` is
    /// provided, starts a new one.
    pub fn reconfigure(&self, config: Option<conf::Connection>) {
        self.0.teardown();
        if let Some(config) = config {
            self.0.connect(&config);
        }
    }

    #[inline]
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection(Rc::downgrade(&self.0))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("quality", &self.quality())
            .finish()
    }
}

impl Inner {
    /// Creates a new engine connection and starts connecting.
    fn connect(self: &Rc<Self>, config: &conf::Connection) {
        let config = match &self.room_hint {
            Some(room) => config.with_room_hint(room),
            None => config.clone(),
        };
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let connection = self.engine.engine().new_connection(&config);
        let weak = Rc::downgrade(self);
        let wiring = Rc::new_cyclic(|own| {
            Wiring::new(
                Rc::clone(&connection),
                event_spec(&weak, generation, own),
            )
        });
        wiring.attach();
        *self.current.borrow_mut() = Some(Instance {
            connection: Rc::clone(&connection),
            wiring,
        });

        self.set_status(ConnectionState::Connecting);
        connection.connect();
    }

    /// Updates the [`ConnectionState`], exposing the live engine connection
    /// only if [`ConnectionState::Connected`].
    fn set_status(&self, state: ConnectionState) {
        let live = if state == ConnectionState::Connected {
            self.current
                .borrow()
                .as_ref()
                .map(|i| LiveConnection(Rc::clone(&i.connection)))
        } else {
            None
        };
        self.live.set(live);
        self.state.set(state);
    }

    /// Disconnects the current engine connection.
    fn teardown(&self) {
        let current = self
            .current
            .borrow()
            .as_ref()
            .map(|i| (Rc::clone(&i.connection), Rc::clone(&i.wiring)));
        let (connection, wiring) = match current {
            Some(current) => current,
            None => return,
        };

        match self.state.get() {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.set_status(ConnectionState::Disconnecting);
                connection.disconnect();

                let timeout = self.timeouts.listeners_cleanup;
                platform::spawn(async move {
                    platform::delay_for(timeout).await;
                    wiring.detach();
                });
            }
            _ => wiring.detach(),
        }
    }

    /// Handles the provided [`EngineEvent`] of the engine connection number
    /// `generation`.
    fn handle_event(&self, generation: u64, event: EngineEvent) {
        if generation != self.generation.get() {
            log::debug!("Ignoring {} of a superseded connection", event.name());
            return;
        }
        match event {
            EngineEvent::Connection(ev) => match ev {
                ConnectionEvent::Established => {
                    self.set_status(ConnectionState::Connected);
                }
                ConnectionEvent::Failed => {
                    self.set_status(ConnectionState::Failed);
                }
                ConnectionEvent::Disconnected => {
                    self.set_status(ConnectionState::Disconnected);
                }
                ConnectionEvent::WrongState => {
                    log::error!("Connection is in wrong state");
                    self.set_status(ConnectionState::Failed);
                }
            },
            EngineEvent::ConnectionQuality(
                ConnectionQualityEvent::LocalStatsUpdated { connection_quality },
            ) => {
                log::debug!("Connection quality: {}", connection_quality);
                self.quality.set(connection_quality);
            }
            EngineEvent::Conference(_) | EngineEvent::Track(_) => {
                log::warn!("Unexpected {} on connection", event.name());
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(instance) = self.current.get_mut().take() {
            if matches!(
                self.state.get(),
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                instance.connection.disconnect();
            }
            instance.wiring.detach();
        }
    }
}

/// Builds listeners of the engine connection number `generation`.
///
/// Disconnection always detaches the listeners of its own engine connection,
/// even if it is superseded already.
fn event_spec(
    weak: &Weak<Inner>,
    generation: u64,
    own: &Weak<Wiring<dyn EngineConnection>>,
) -> EventSpec {
    let weak = weak.clone();
    let own = own.clone();
    let listener = move |event: EngineEvent| {
        if let EngineEvent::Connection(ConnectionEvent::Disconnected) = event {
            if let Some(wiring) = own.upgrade() {
                wiring.detach();
            }
        }
        let inner: Result<_, Traced<HandlerDetachedError>> =
            upgrade_or_detached!(weak);
        match inner {
            Ok(inner) => inner.handle_event(generation, event),
            Err(e) => ConclaveError::from(e).print(),
        }
    };

    EventSpec::new()
        .on(EventName::ConnectionEstablished, listener.clone())
        .on(EventName::ConnectionFailed, listener.clone())
        .on(EventName::ConnectionDisconnected, listener.clone())
        .on(EventName::WrongState, listener.clone())
        .on(EventName::LocalStatsUpdated, listener)
}

/// Weak reference to a [`Connection`].
#[derive(Clone, Debug)]
pub struct WeakConnection(Weak<Inner>);

impl WeakConnection {
    #[inline]
    pub fn upgrade(&self) -> Option<Connection> {
        self.0.upgrade().map(Connection)
    }
}
