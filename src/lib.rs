//! Reactive state layer between a real-time media engine and a presentation
//! layer.
//!
//! Keeps observable representations of the signaling [`Connection`], the
//! joined [`Conference`]s and their [`Participant`]s in sync with the events
//! reported by an external [`Engine`].
//!
//! All the components are single-threaded and must be driven from a
//! [`tokio::task::LocalSet`].
//!
//! [`Conference`]: conference::Conference
//! [`Connection`]: connection::Connection
//! [`Engine`]: engine::Engine
//! [`Participant`]: participant::Participant

#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

#[macro_use]
pub mod utils;

pub mod client;
pub mod conf;
pub mod conference;
pub mod conferences;
pub mod connection;
pub mod engine;
pub mod logging;
pub mod media;
pub mod participant;
pub mod platform;

#[doc(inline)]
pub use self::{
    client::Client,
    conf::Conf,
    conference::{Conference, ConferenceState},
    conferences::Conferences,
    connection::{Connection, ConnectionState},
    media::{LocalTracks, MediaKind},
    participant::{Participant, ParticipantRegistry},
};
