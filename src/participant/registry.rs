//! Remote participants of a single engine conference.

use std::cell::RefCell;

use conclave_reactive::ObservableHashMap;
use futures::stream::LocalBoxStream;

use super::Participant;

/// Mapping of participant IDs to remote [`Participant`]s.
///
/// The only writer of its records: they are created and updated through
/// [`ParticipantRegistry::update_participant`] exclusively.
#[derive(Debug, Default)]
pub struct ParticipantRegistry(RefCell<ObservableHashMap<String, Participant>>);

impl ParticipantRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the provided `mutator` to the [`Participant`] with the
    /// provided `id`, creating it if there is none.
    ///
    /// The `mutator` receives `true` if the [`Participant`] has just been
    /// created. A new [`Participant`] is inserted after the `mutator`
    /// returns, without yielding in between, so there is never more than one
    /// record per `id`.
    pub fn update_participant<F, R>(&self, id: &str, mutator: F) -> R
    where
        F: FnOnce(&Participant, bool) -> R,
    {
        let existing = self.0.borrow().get(&id.to_owned()).cloned();
        if let Some(participant) = existing {
            return mutator(&participant, false);
        }

        let participant = Participant::new(false);
        let out = mutator(&participant, true);
        let mut store = self.0.borrow_mut();
        if store.contains_key(&id.to_owned()) {
            log::warn!("Participant `{}` should not exist", id);
        }
        drop(store.insert(id.to_owned(), participant));
        out
    }

    /// Removes the [`Participant`] with the provided `id` entirely.
    pub fn remove(&self, id: &str) -> Option<Participant> {
        self.0.borrow_mut().remove(&id.to_owned())
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<Participant> {
        self.0.borrow().get(&id.to_owned()).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Returns IDs of all the [`Participant`]s.
    pub fn ids(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Returns all the [`Participant`]s along with their IDs.
    pub fn participants(&self) -> Vec<(String, Participant)> {
        self.0
            .borrow()
            .iter()
            .map(|(id, p)| (id.clone(), p.clone()))
            .collect()
    }

    /// Streams created [`Participant`]s, starting with the present ones.
    #[inline]
    pub fn on_insert(&self) -> LocalBoxStream<'static, (String, Participant)> {
        self.0.borrow().on_insert()
    }

    /// Streams removed [`Participant`]s.
    ///
    /// All the remaining [`Participant`]s are emitted once this
    /// [`ParticipantRegistry`] is dropped.
    #[inline]
    pub fn on_remove(&self) -> LocalBoxStream<'static, (String, Participant)> {
        self.0.borrow().on_remove()
    }
}
