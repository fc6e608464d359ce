//! Entry point of the library.

use std::{cell::RefCell, rc::Rc};

use tracerr::Traced;

use crate::{
    conf::{self, Conf},
    connection::Connection,
    engine::{Engine, EngineError, EngineHandle},
    media::LocalTracks,
    utils::ConfigRequiredError,
};

/// Root of the observable state: the initialized [`Engine`], the local
/// tracks shared by all the conferences and the current [`Connection`].
#[derive(Clone)]
pub struct Client(Rc<Inner>);

struct Inner {
    conf: Conf,
    engine: EngineHandle,
    local_tracks: LocalTracks,
    connection: RefCell<Option<Connection>>,
}

impl Client {
    /// Initializes the provided [`Engine`] with [`conf::Engine`] settings and
    /// creates a new [`Client`] on top of it.
    ///
    /// # Errors
    ///
    /// With [`EngineError`] if the [`Engine`] fails to initialize.
    pub fn new(
        engine: Rc<dyn Engine>,
        conf: Conf,
    ) -> Result<Self, Traced<EngineError>> {
        let engine = EngineHandle::new(engine);
        engine.init(&conf.engine).map_err(tracerr::wrap!())?;
        let local_tracks = LocalTracks::new(engine.clone());

        Ok(Self(Rc::new(Inner {
            conf,
            engine,
            local_tracks,
            connection: RefCell::new(None),
        })))
    }

    /// Connects to the server with the provided `config`, disconnecting the
    /// current [`Connection`], if any.
    ///
    /// # Errors
    ///
    /// With [`ConfigRequiredError`] if `config` is `None`. The current
    /// [`Connection`] is kept then.
    pub fn connect(
        &self,
        config: Option<conf::Connection>,
        room_hint: Option<&str>,
    ) -> Result<Connection, Traced<ConfigRequiredError>> {
        let connection = Connection::new(
            self.0.engine.clone(),
            config,
            room_hint,
            self.0.local_tracks.clone(),
            self.0.conf.timeouts,
        )
        .map_err(tracerr::wrap!())?;

        let previous = self.0.connection.replace(Some(connection.clone()));
        if let Some(previous) = previous {
            previous.disconnect();
        }
        Ok(connection)
    }

    /// Connects to the server configured in [`Conf::connection`].
    ///
    /// # Errors
    ///
    /// Never errors actually, as the configured settings are always present.
    pub fn connect_default(
        &self,
        room_hint: Option<&str>,
    ) -> Result<Connection, Traced<ConfigRequiredError>> {
        self.connect(Some(self.0.conf.connection.clone()), room_hint)
    }

    /// Returns the current [`Connection`], if any.
    #[inline]
    pub fn connection(&self) -> Option<Connection> {
        self.0.connection.borrow().clone()
    }

    #[inline]
    pub fn local_tracks(&self) -> &LocalTracks {
        &self.0.local_tracks
    }

    #[inline]
    pub fn conf(&self) -> &Conf {
        &self.0.conf
    }

    /// Disconnects the current [`Connection`] and releases the local tracks.
    pub async fn dispose(&self) {
        let connection = self.0.connection.take();
        if let Some(connection) = connection {
            connection.disconnect();
        }
        self.0.local_tracks.clear().await;
    }
}
