//! Signaling connection settings passed to the engine.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use url::Url;

/// XMPP hosts of the signaling server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Hosts {
    /// Defaults to `meet.jit.si`.
    #[default("meet.jit.si")]
    pub domain: Cow<'static, str>,

    /// Multi-user chat host.
    ///
    /// Defaults to `conference.meet.jit.si`.
    #[default("conference.meet.jit.si")]
    pub muc: Cow<'static, str>,

    /// Focus component host.
    ///
    /// Defaults to `focus.meet.jit.si`.
    #[default("focus.meet.jit.si")]
    pub focus: Cow<'static, str>,
}

/// Peer-to-peer mode settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct P2p {
    #[default(true)]
    pub enabled: bool,

    #[default(true)]
    pub prefer_h264: bool,

    #[default(true)]
    pub disable_h264: bool,

    #[default(true)]
    pub use_stun_turn: bool,
}

/// Settings of a connection to the signaling server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Connection {
    pub hosts: Hosts,

    /// Defaults to `https://meet.jit.si/http-pre-bind`.
    #[default("https://meet.jit.si/http-pre-bind")]
    pub external_connect_url: Cow<'static, str>,

    #[default(true)]
    pub enable_p2p: bool,

    pub p2p: P2p,

    #[default(true)]
    pub use_stun_turn: bool,

    /// BOSH endpoint.
    ///
    /// Defaults to `https://meet.jit.si/http-bind`.
    #[default("https://meet.jit.si/http-bind")]
    pub service_url: Cow<'static, str>,

    /// WebSocket endpoint, preferred over [`Connection::service_url`] by the
    /// engine when present.
    ///
    /// Defaults to `wss://meet.jit.si/xmpp-websocket`.
    #[default(Some("wss://meet.jit.si/xmpp-websocket".into()))]
    pub websocket: Option<Cow<'static, str>>,

    /// Defaults to `http://jitsi.org/jitsimeet`.
    #[default("http://jitsi.org/jitsimeet")]
    pub client_node: Cow<'static, str>,
}

impl Connection {
    /// Returns a copy of this [`Connection`] with the provided `room`
    /// appended as the `room` query parameter to the service and the
    /// WebSocket endpoints.
    ///
    /// Endpoints which are not valid URLs are left intact.
    #[must_use]
    pub fn with_room_hint(&self, room: &str) -> Self {
        let mut conf = self.clone();
        conf.service_url = append_room(&conf.service_url, room);
        conf.websocket = conf.websocket.map(|ws| append_room(&ws, room));
        conf
    }
}

/// Appends the `room` query parameter to the provided `endpoint`.
fn append_room(endpoint: &str, room: &str) -> Cow<'static, str> {
    match Url::parse(endpoint) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("room", room);
            url.to_string().into()
        }
        Err(e) => {
            log::warn!("Cannot add room hint to `{}`: {}", endpoint, e);
            endpoint.to_owned().into()
        }
    }
}
