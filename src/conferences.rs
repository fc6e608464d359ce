//! Set of [`Conference`]s joined over a single [`Connection`].
//!
//! [`Connection`]: crate::connection::Connection

use std::{cell::RefCell, fmt};

use conclave_reactive::ObservableHashMap;
use futures::stream::LocalBoxStream;

use crate::{
    conf, conference::Conference, connection::WeakConnection,
    media::LocalTracks,
};

/// [`Conference`]s of a single [`Connection`] keyed by their room IDs.
///
/// All the [`Conference`]s are disposed once this set is dropped.
///
/// [`Connection`]: crate::connection::Connection
pub struct Conferences {
    connection: WeakConnection,
    local_tracks: LocalTracks,
    timeouts: conf::Timeouts,
    rooms: RefCell<ObservableHashMap<String, Conference>>,
}

impl Conferences {
    /// Creates an empty set of [`Conference`]s bound to the provided
    /// `connection`.
    pub fn new(
        connection: WeakConnection,
        local_tracks: LocalTracks,
        timeouts: conf::Timeouts,
    ) -> Self {
        Self {
            connection,
            local_tracks,
            timeouts,
            rooms: RefCell::new(ObservableHashMap::new()),
        }
    }

    /// Joins the room with the provided `id`.
    ///
    /// Returns the already existing [`Conference`] if the room has been
    /// joined before.
    pub fn join(&self, id: &str) -> Conference {
        let key = id.to_owned();
        if let Some(room) = self.rooms.borrow().get(&key) {
            return room.clone();
        }

        log::debug!("Joining conference `{}`", id);
        let room = Conference::join(
            key.clone(),
            self.connection.clone(),
            self.local_tracks.clone(),
            self.timeouts,
        );
        drop(self.rooms.borrow_mut().insert(key, room.clone()));
        room
    }

    /// Leaves the room with the provided `id`, disposing its [`Conference`].
    ///
    /// Returns `false` if there is no such room.
    pub fn leave(&self, id: &str) -> bool {
        let room = self.rooms.borrow_mut().remove(&id.to_owned());
        match room {
            Some(room) => {
                log::debug!("Leaving conference `{}`", id);
                room.dispose();
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<Conference> {
        self.rooms.borrow().get(&id.to_owned()).cloned()
    }

    /// Returns IDs of all the joined rooms.
    pub fn ids(&self) -> Vec<String> {
        self.rooms.borrow().keys().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rooms.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rooms.borrow().is_empty()
    }

    /// Streams joined [`Conference`]s, starting with the present ones.
    #[inline]
    pub fn on_join(&self) -> LocalBoxStream<'static, (String, Conference)> {
        self.rooms.borrow().on_insert()
    }

    /// Streams left [`Conference`]s.
    #[inline]
    pub fn on_leave(&self) -> LocalBoxStream<'static, (String, Conference)> {
        self.rooms.borrow().on_remove()
    }
}

impl Drop for Conferences {
    fn drop(&mut self) {
        for room in self.rooms.get_mut().values() {
            room.dispose();
        }
    }
}

impl fmt::Debug for Conferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conferences")
            .field("rooms", &self.ids())
            .finish()
    }
}
