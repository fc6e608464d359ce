//! Events emitted by the [`Engine`] objects.
//!
//! [`Engine`]: super::Engine

use std::{fmt, rc::Rc};

use derive_more::{Display, From};

use super::MediaTrack;

/// Category of [`EventName`]s.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum EventCategory {
    #[display(fmt = "connection")]
    Connection,

    #[display(fmt = "connectionQuality")]
    ConnectionQuality,

    #[display(fmt = "conference")]
    Conference,

    #[display(fmt = "track")]
    Track,
}

/// Name of an event which listeners are registered for.
///
/// Displayed as `category.NAME`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventName {
    ConnectionEstablished,
    ConnectionFailed,
    ConnectionDisconnected,
    WrongState,
    LocalStatsUpdated,
    ConferenceJoined,
    ConferenceLeft,
    ConferenceFailed,
    ConferenceError,
    Kicked,
    UserJoined,
    UserLeft,
    UserRoleChanged,
    TrackAdded,
    TrackRemoved,
    TrackAudioLevelChanged,

    /// Audio level change of a single local track, emitted by the track
    /// itself.
    AudioLevelChanged,
}

impl EventName {
    /// Returns [`EventCategory`] of this [`EventName`].
    pub fn category(self) -> EventCategory {
        use EventName as N;

        match self {
            N::ConnectionEstablished
            | N::ConnectionFailed
            | N::ConnectionDisconnected
            | N::WrongState => EventCategory::Connection,
            N::LocalStatsUpdated => EventCategory::ConnectionQuality,
            N::ConferenceJoined
            | N::ConferenceLeft
            | N::ConferenceFailed
            | N::ConferenceError
            | N::Kicked
            | N::UserJoined
            | N::UserLeft
            | N::UserRoleChanged
            | N::TrackAdded
            | N::TrackRemoved
            | N::TrackAudioLevelChanged => EventCategory::Conference,
            N::AudioLevelChanged => EventCategory::Track,
        }
    }

    /// Returns the engine-side name of this [`EventName`] within its
    /// [`EventCategory`].
    pub fn as_str(self) -> &'static str {
        use EventName as N;

        match self {
            N::ConnectionEstablished => "CONNECTION_ESTABLISHED",
            N::ConnectionFailed => "CONNECTION_FAILED",
            N::ConnectionDisconnected => "CONNECTION_DISCONNECTED",
            N::WrongState => "WRONG_STATE",
            N::LocalStatsUpdated => "LOCAL_STATS_UPDATED",
            N::ConferenceJoined => "CONFERENCE_JOINED",
            N::ConferenceLeft => "CONFERENCE_LEFT",
            N::ConferenceFailed => "CONFERENCE_FAILED",
            N::ConferenceError => "CONFERENCE_ERROR",
            N::Kicked => "KICKED",
            N::UserJoined => "USER_JOINED",
            N::UserLeft => "USER_LEFT",
            N::UserRoleChanged => "USER_ROLE_CHANGED",
            N::TrackAdded => "TRACK_ADDED",
            N::TrackRemoved => "TRACK_REMOVED",
            N::TrackAudioLevelChanged | N::AudioLevelChanged => {
                "TRACK_AUDIO_LEVEL_CHANGED"
            }
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category(), self.as_str())
    }
}

/// Events of the `connection` category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConnectionEvent {
    Established,
    Failed,
    Disconnected,
    WrongState,
}

/// Events of the `connectionQuality` category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConnectionQualityEvent {
    LocalStatsUpdated { connection_quality: f64 },
}

/// Participant data reported along with [`ConferenceEvent::UserJoined`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParticipantInfo {
    /// Engine-assigned identity of the participant.
    pub id: String,

    /// Server-assigned role of the participant.
    pub role: String,
}

/// Events of the `conference` category.
#[derive(Clone, Debug)]
pub enum ConferenceEvent {
    Joined,
    Left,
    Failed,

    /// Engine-reported error with its numeric code.
    Error(i32),

    Kicked,

    UserJoined {
        id: String,
        participant: ParticipantInfo,
    },

    UserLeft {
        id: String,
    },

    UserRoleChanged {
        id: String,
        role: String,
    },

    TrackAdded(Rc<dyn MediaTrack>),

    TrackRemoved(Rc<dyn MediaTrack>),

    TrackAudioLevelChanged {
        participant_id: String,
        level: f64,
    },
}

/// Events of the `track` category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackEvent {
    AudioLevelChanged(f64),
}

/// Any event emitted by the [`Engine`] objects.
///
/// [`Engine`]: super::Engine
#[derive(Clone, Debug, From)]
pub enum EngineEvent {
    Connection(ConnectionEvent),
    ConnectionQuality(ConnectionQualityEvent),
    Conference(ConferenceEvent),
    Track(TrackEvent),
}

impl EngineEvent {
    /// Returns [`EventName`] this [`EngineEvent`] is dispatched under.
    pub fn name(&self) -> EventName {
        use EventName as N;

        match self {
            Self::Connection(ev) => match ev {
                ConnectionEvent::Established => N::ConnectionEstablished,
                ConnectionEvent::Failed => N::ConnectionFailed,
                ConnectionEvent::Disconnected => N::ConnectionDisconnected,
                ConnectionEvent::WrongState => N::WrongState,
            },
            Self::ConnectionQuality(
                ConnectionQualityEvent::LocalStatsUpdated { .. },
            ) => N::LocalStatsUpdated,
            Self::Conference(ev) => match ev {
                ConferenceEvent::Joined => N::ConferenceJoined,
                ConferenceEvent::Left => N::ConferenceLeft,
                ConferenceEvent::Failed => N::ConferenceFailed,
                ConferenceEvent::Error(_) => N::ConferenceError,
                ConferenceEvent::Kicked => N::Kicked,
                ConferenceEvent::UserJoined { .. } => N::UserJoined,
                ConferenceEvent::UserLeft { .. } => N::UserLeft,
                ConferenceEvent::UserRoleChanged { .. } => N::UserRoleChanged,
                ConferenceEvent::TrackAdded(_) => N::TrackAdded,
                ConferenceEvent::TrackRemoved(_) => N::TrackRemoved,
                ConferenceEvent::TrackAudioLevelChanged { .. } => {
                    N::TrackAudioLevelChanged
                }
            },
            Self::Track(TrackEvent::AudioLevelChanged(_)) => {
                N::AudioLevelChanged
            }
        }
    }
}
