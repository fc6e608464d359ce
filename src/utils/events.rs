//! Batch attachment and detachment of engine event listeners.

use std::{cell::Cell, collections::HashMap, fmt, rc::Rc, str::FromStr};

use tracerr::Traced;

use crate::engine::{
    EngineEvent, EventCategory, EventName, EventTarget, Listener,
};

use super::InvalidDirectionError;

/// Direction of a [`wire`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Add listeners.
    Attach,

    /// Remove listeners.
    Detach,
}

impl FromStr for Direction {
    type Err = Traced<InvalidDirectionError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" | "attach" => Ok(Self::Attach),
            "remove" | "detach" => Ok(Self::Detach),
            _ => Err(tracerr::new!(InvalidDirectionError(s.to_owned()))),
        }
    }
}

/// Direction of a track change in a participant's track set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackDirection {
    Add,
    Remove,
}

impl FromStr for TrackDirection {
    type Err = Traced<InvalidDirectionError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<Direction>()? {
            Direction::Attach => Self::Add,
            Direction::Detach => Self::Remove,
        })
    }
}

/// Two-level mapping of listeners: [`EventCategory`] → [`EventName`] →
/// [`Listener`].
#[derive(Clone, Default)]
pub struct EventSpec(HashMap<EventCategory, HashMap<EventName, Listener>>);

impl EventSpec {
    /// Creates an empty [`EventSpec`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provided `listener` for the events named `name`,
    /// replacing the previously registered one.
    #[must_use]
    pub fn on<F>(mut self, name: EventName, listener: F) -> Self
    where
        F: Fn(EngineEvent) + 'static,
    {
        drop(
            self.0
                .entry(name.category())
                .or_default()
                .insert(name, Rc::new(listener)),
        );
        self
    }

    /// Iterates over all the registered listeners.
    pub fn iter(&self) -> impl Iterator<Item = (EventName, &Listener)> + '_ {
        self.0
            .values()
            .flat_map(|by_name| by_name.iter().map(|(n, l)| (*n, l)))
    }

    /// Returns the number of the registered listeners.
    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    /// Indicates whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|(name, _)| name))
            .finish()
    }
}

/// Adds or removes every listener of the provided `spec` on the provided
/// `target`.
pub fn wire<T>(direction: Direction, target: &T, spec: &EventSpec)
where
    T: EventTarget + ?Sized,
{
    for (name, listener) in spec.iter() {
        match direction {
            Direction::Attach => {
                target.add_event_listener(name, Rc::clone(listener));
            }
            Direction::Detach => target.remove_event_listener(name, listener),
        }
    }
}

/// [`EventSpec`] bound to its [`EventTarget`].
///
/// Guarantees that listeners attached once are detached exactly once:
/// repeated [`Wiring::attach`] and [`Wiring::detach`] calls are no-ops, and a
/// [`Wiring`] still attached on [`Drop`] detaches itself.
pub struct Wiring<T: EventTarget + ?Sized> {
    target: Rc<T>,
    spec: EventSpec,
    attached: Cell<bool>,
}

impl<T: EventTarget + ?Sized> Wiring<T> {
    /// Creates a new detached [`Wiring`].
    pub fn new(target: Rc<T>, spec: EventSpec) -> Self {
        Self {
            target,
            spec,
            attached: Cell::new(false),
        }
    }

    /// Attaches all the listeners unless attached already.
    pub fn attach(&self) {
        if !self.attached.replace(true) {
            wire(Direction::Attach, self.target.as_ref(), &self.spec);
        }
    }

    /// Detaches all the listeners unless detached already.
    pub fn detach(&self) {
        if self.attached.replace(false) {
            wire(Direction::Detach, self.target.as_ref(), &self.spec);
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    #[inline]
    pub fn target(&self) -> &Rc<T> {
        &self.target
    }
}

impl<T: EventTarget + ?Sized> fmt::Debug for Wiring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wiring")
            .field("spec", &self.spec)
            .field("attached", &self.attached.get())
            .finish()
    }
}

impl<T: EventTarget + ?Sized> Drop for Wiring<T> {
    fn drop(&mut self) {
        self.detach();
    }
}
