//! Interface of the external real-time media engine.
//!
//! The engine owns the transport, the signaling protocol and the media
//! pipeline. This crate only consumes the capability surface described by
//! the traits below.

pub mod event;

use std::{cell::Cell, fmt, rc::Rc};

use derive_more::Display;
use futures::future::LocalBoxFuture;
use tracerr::Traced;

use crate::{conf, media::MediaKind, utils::NamedError};

#[doc(inline)]
pub use self::event::{
    ConferenceEvent, ConnectionEvent, ConnectionQualityEvent, EngineEvent,
    EventCategory, EventName, ParticipantInfo, TrackEvent,
};

/// Callback registered on an [`EventTarget`].
pub type Listener = Rc<dyn Fn(EngineEvent)>;

/// Indicates whether the provided [`Listener`]s are the same callback.
#[inline]
pub fn same_listener(a: &Listener, b: &Listener) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Object which events can be listened to.
#[cfg_attr(test, mockall::automock)]
pub trait EventTarget {
    /// Registers the provided `listener` for the events named `name`.
    fn add_event_listener(&self, name: EventName, listener: Listener);

    /// Unregisters the provided `listener` from the events named `name`.
    ///
    /// Unregistering a listener which is not registered is a no-op.
    fn remove_event_listener(&self, name: EventName, listener: &Listener);
}

/// Error reported by the engine for a conference or track operation.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum EngineError {
    /// Operated track has already been disposed.
    ///
    /// Expected during teardown and treated as success.
    #[display(fmt = "Track is disposed")]
    TrackIsDisposed,

    /// Any other failure.
    #[display(fmt = "{}", _0)]
    Failed(String),
}

impl NamedError for EngineError {
    fn name(&self) -> &'static str {
        match self {
            Self::TrackIsDisposed => "TrackIsDisposed",
            Self::Failed(_) => "EngineError",
        }
    }
}

/// Failed to acquire local media tracks.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "Failed to acquire local tracks: {}", _0)]
pub struct AcquisitionError(pub String);

/// Transport of the bridge channel of a conference.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum BridgeChannel {
    #[display(fmt = "websocket")]
    WebSocket,

    /// Legacy multiplexed data channel.
    #[display(fmt = "datachannel")]
    DataChannel,
}

/// Options of a newly initialized [`EngineConference`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConferenceOptions {
    pub open_bridge_channel: BridgeChannel,
}

/// Options of a local tracks acquisition.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LocalTracksOptions {
    /// Kinds of the acquired tracks.
    pub devices: Vec<MediaKind>,

    /// ID of the camera to capture video from.
    pub camera_device_id: Option<String>,

    /// ID of the microphone to capture audio from.
    pub mic_device_id: Option<String>,
}

/// Entry point of the engine.
pub trait Engine {
    /// Performs the process-wide initialization.
    fn init(&self, options: &conf::Engine) -> Result<(), EngineError>;

    /// Creates a new [`EngineConnection`] with the provided configuration.
    ///
    /// The returned connection is not connected yet.
    fn new_connection(
        &self,
        config: &conf::Connection,
    ) -> Rc<dyn EngineConnection>;

    /// Acquires local media tracks.
    fn create_local_tracks(
        &self,
        options: LocalTracksOptions,
    ) -> LocalBoxFuture<'static, Result<Vec<Rc<dyn MediaTrack>>, AcquisitionError>>;
}

/// Connection to the signaling server.
pub trait EngineConnection: EventTarget + fmt::Debug {
    fn connect(&self);

    fn disconnect(&self);

    /// Creates a new [`EngineConference`] named `name` within this
    /// connection. The returned conference is not joined yet.
    fn init_conference(
        &self,
        name: &str,
        options: ConferenceOptions,
    ) -> Rc<dyn EngineConference>;
}

/// Conference within an [`EngineConnection`].
pub trait EngineConference: EventTarget + fmt::Debug {
    /// Returns the identity the engine assigned to the local participant.
    fn my_user_id(&self) -> String;

    fn join(&self);

    fn leave(&self) -> LocalBoxFuture<'static, Result<(), EngineError>>;

    /// Returns local tracks currently added to this conference.
    fn local_tracks(&self) -> Vec<Rc<dyn MediaTrack>>;

    fn add_track(
        &self,
        track: Rc<dyn MediaTrack>,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>>;

    fn remove_track(
        &self,
        track: Rc<dyn MediaTrack>,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>>;
}

/// Local or remote media track.
pub trait MediaTrack: EventTarget + fmt::Debug {
    fn id(&self) -> String;

    fn kind(&self) -> MediaKind;

    /// Returns ID of the participant this track belongs to, if the engine
    /// knows it.
    fn participant_id(&self) -> Option<String>;

    fn is_local(&self) -> bool;

    /// Releases the underlying media source.
    fn dispose(&self) -> LocalBoxFuture<'static, Result<(), EngineError>>;
}

/// Shared [`Engine`] guarding its one-time initialization.
#[derive(Clone)]
pub struct EngineHandle(Rc<EngineHandleInner>);

struct EngineHandleInner {
    engine: Rc<dyn Engine>,
    initialized: Cell<bool>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("initialized", &self.0.initialized.get())
            .finish()
    }
}

impl EngineHandle {
    /// Wraps the provided [`Engine`]. The [`Engine`] is not initialized yet.
    #[must_use]
    pub fn new(engine: Rc<dyn Engine>) -> Self {
        Self(Rc::new(EngineHandleInner {
            engine,
            initialized: Cell::new(false),
        }))
    }

    /// Initializes the underlying [`Engine`] unless it is initialized
    /// already.
    ///
    /// # Errors
    ///
    /// With [`EngineError`] if the [`Engine`] fails to initialize. A failed
    /// initialization may be retried.
    pub fn init(
        &self,
        options: &conf::Engine,
    ) -> Result<(), Traced<EngineError>> {
        if self.0.initialized.get() {
            log::debug!("Engine is initialized already");
            return Ok(());
        }
        self.0.engine.init(options).map_err(tracerr::wrap!())?;
        self.0.initialized.set(true);
        Ok(())
    }

    /// Indicates whether the underlying [`Engine`] has been initialized.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.0.initialized.get()
    }

    /// Returns the underlying [`Engine`].
    #[inline]
    pub fn engine(&self) -> &Rc<dyn Engine> {
        &self.0.engine
    }
}
