//! In-memory [`Engine`] recording the calls made by the library.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use conclave::{
    conf,
    engine::{
        same_listener, AcquisitionError, ConferenceOptions, Engine,
        EngineConference, EngineConnection, EngineError, EngineEvent,
        EventName, EventTarget, Listener, LocalTracksOptions, MediaTrack,
    },
    MediaKind,
};
use futures::future::{self, FutureExt as _, LocalBoxFuture};
use tokio::time;

/// Event listeners registered on a fake engine object.
#[derive(Default)]
pub struct Listeners(RefCell<Vec<(EventName, Listener)>>);

impl Listeners {
    /// Returns the number of the registered listeners.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Dispatches the provided `event` to the listeners of its name.
    pub fn emit<E: Into<EngineEvent>>(&self, event: E) {
        let event = event.into();
        let name = event.name();
        let listeners: Vec<_> = self
            .0
            .borrow()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn add(&self, name: EventName, listener: Listener) {
        self.0.borrow_mut().push((name, listener));
    }

    fn remove(&self, name: EventName, listener: &Listener) {
        self.0
            .borrow_mut()
            .retain(|(n, l)| !(*n == name && same_listener(l, listener)));
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners({})", self.len())
    }
}

fn same_track(a: &Rc<dyn MediaTrack>, b: &Rc<dyn MediaTrack>) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Outcome of [`EngineConference::leave`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Leave {
    Resolve,
    Fail,
    Never,
}

/// Wraps the provided result into a future resolving after `delay`.
fn delayed<T: 'static>(
    delay: Duration,
    result: T,
) -> LocalBoxFuture<'static, T> {
    if delay == Duration::ZERO {
        future::ready(result).boxed_local()
    } else {
        async move {
            time::sleep(delay).await;
            result
        }
        .boxed_local()
    }
}

static NEXT_TRACK_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug)]
pub struct FakeTrack {
    pub listeners: Listeners,
    id: String,
    kind: MediaKind,
    participant_id: Option<String>,
    local: bool,
    disposed: Rc<Cell<bool>>,
    dispose_delay: Duration,
}

impl FakeTrack {
    fn new(
        kind: MediaKind,
        participant_id: Option<&str>,
        local: bool,
        dispose_delay: Duration,
    ) -> Rc<Self> {
        let prefix = if local { "local" } else { "remote" };
        Rc::new(Self {
            listeners: Listeners::default(),
            id: format!(
                "{}-{}-{}",
                prefix,
                kind,
                NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
            ),
            kind,
            participant_id: participant_id.map(ToOwned::to_owned),
            local,
            disposed: Rc::default(),
            dispose_delay,
        })
    }

    pub fn local(kind: MediaKind) -> Rc<Self> {
        Self::new(kind, None, true, Duration::ZERO)
    }

    pub fn remote(kind: MediaKind, participant_id: Option<&str>) -> Rc<Self> {
        Self::new(kind, participant_id, false, Duration::ZERO)
    }

    /// Returns another object of the same engine track: equal ID, kind and
    /// owner, but a distinct allocation.
    pub fn duplicate(&self) -> Rc<Self> {
        Rc::new(Self {
            listeners: Listeners::default(),
            id: self.id.clone(),
            kind: self.kind,
            participant_id: self.participant_id.clone(),
            local: self.local,
            disposed: Rc::clone(&self.disposed),
            dispose_delay: self.dispose_delay,
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl EventTarget for FakeTrack {
    fn add_event_listener(&self, name: EventName, listener: Listener) {
        self.listeners.add(name, listener);
    }

    fn remove_event_listener(&self, name: EventName, listener: &Listener) {
        self.listeners.remove(name, listener);
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn participant_id(&self) -> Option<String> {
        self.participant_id.clone()
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn dispose(&self) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        if self.disposed.get() {
            return Box::pin(future::err(EngineError::TrackIsDisposed));
        }
        let disposed = Rc::clone(&self.disposed);
        delayed(self.dispose_delay, ())
            .map(move |()| {
                disposed.set(true);
                Ok(())
            })
            .boxed_local()
    }
}

#[derive(Debug)]
pub struct FakeConference {
    pub name: String,
    pub user_id: String,
    pub listeners: Listeners,
    pub join_calls: Cell<usize>,
    pub leave_calls: Cell<usize>,
    pub add_calls: Cell<usize>,
    pub tracks: RefCell<Vec<Rc<dyn MediaTrack>>>,
    leave: Leave,
}

impl FakeConference {
    /// Indicates whether the provided `track` is added to this conference.
    pub fn has_track(&self, track: &Rc<dyn MediaTrack>) -> bool {
        self.tracks.borrow().iter().any(|t| same_track(t, track))
    }
}

impl EventTarget for FakeConference {
    fn add_event_listener(&self, name: EventName, listener: Listener) {
        self.listeners.add(name, listener);
    }

    fn remove_event_listener(&self, name: EventName, listener: &Listener) {
        self.listeners.remove(name, listener);
    }
}

impl EngineConference for FakeConference {
    fn my_user_id(&self) -> String {
        self.user_id.clone()
    }

    fn join(&self) {
        self.join_calls.set(self.join_calls.get() + 1);
    }

    fn leave(&self) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        self.leave_calls.set(self.leave_calls.get() + 1);
        match self.leave {
            Leave::Resolve => Box::pin(future::ok(())),
            Leave::Fail => {
                Box::pin(future::err(EngineError::Failed("timed out".into())))
            }
            Leave::Never => Box::pin(future::pending()),
        }
    }

    fn local_tracks(&self) -> Vec<Rc<dyn MediaTrack>> {
        self.tracks.borrow().clone()
    }

    fn add_track(
        &self,
        track: Rc<dyn MediaTrack>,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        self.add_calls.set(self.add_calls.get() + 1);
        self.tracks.borrow_mut().push(track);
        Box::pin(future::ok(()))
    }

    fn remove_track(
        &self,
        track: Rc<dyn MediaTrack>,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        self.tracks.borrow_mut().retain(|t| !same_track(t, &track));
        Box::pin(future::ok(()))
    }
}

#[derive(Debug)]
pub struct FakeConnection {
    pub config: conf::Connection,
    pub listeners: Listeners,
    pub connect_calls: Cell<usize>,
    pub disconnect_calls: Cell<usize>,
    pub conferences: RefCell<Vec<Rc<FakeConference>>>,
    pub options: RefCell<Vec<ConferenceOptions>>,
    leave: Leave,
}

impl FakeConnection {
    /// Returns the engine conference created last.
    pub fn conference(&self) -> Rc<FakeConference> {
        Rc::clone(self.conferences.borrow().last().unwrap())
    }
}

impl EventTarget for FakeConnection {
    fn add_event_listener(&self, name: EventName, listener: Listener) {
        self.listeners.add(name, listener);
    }

    fn remove_event_listener(&self, name: EventName, listener: &Listener) {
        self.listeners.remove(name, listener);
    }
}

impl EngineConnection for FakeConnection {
    fn connect(&self) {
        self.connect_calls.set(self.connect_calls.get() + 1);
    }

    fn disconnect(&self) {
        self.disconnect_calls.set(self.disconnect_calls.get() + 1);
    }

    fn init_conference(
        &self,
        name: &str,
        options: ConferenceOptions,
    ) -> Rc<dyn EngineConference> {
        let conference = Rc::new(FakeConference {
            name: name.to_owned(),
            user_id: "local-user".into(),
            listeners: Listeners::default(),
            join_calls: Cell::new(0),
            leave_calls: Cell::new(0),
            add_calls: Cell::new(0),
            tracks: RefCell::new(Vec::new()),
            leave: self.leave,
        });
        self.options.borrow_mut().push(options);
        self.conferences.borrow_mut().push(Rc::clone(&conference));
        conference
    }
}

pub struct FakeEngine {
    pub init_calls: Cell<usize>,
    pub connections: RefCell<Vec<Rc<FakeConnection>>>,
    pub acquisitions: RefCell<Vec<LocalTracksOptions>>,
    pub tracks: RefCell<Vec<Rc<FakeTrack>>>,
    failing_kinds: RefCell<Vec<MediaKind>>,
    acquire_delays: RefCell<VecDeque<Duration>>,
    dispose_delay: Cell<Duration>,
    leave: Cell<Leave>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            init_calls: Cell::new(0),
            connections: RefCell::new(Vec::new()),
            acquisitions: RefCell::new(Vec::new()),
            tracks: RefCell::new(Vec::new()),
            failing_kinds: RefCell::new(Vec::new()),
            acquire_delays: RefCell::new(VecDeque::new()),
            dispose_delay: Cell::new(Duration::ZERO),
            leave: Cell::new(Leave::Resolve),
        }
    }
}

impl FakeEngine {
    /// Makes acquisitions including the provided `kind` fail.
    pub fn fail_kind(&self, kind: MediaKind) {
        self.failing_kinds.borrow_mut().push(kind);
    }

    /// Delays the next acquisitions, one `delay` per acquisition in order.
    pub fn delay_acquisitions<I>(&self, delays: I)
    where
        I: IntoIterator<Item = Duration>,
    {
        self.acquire_delays.borrow_mut().extend(delays);
    }

    /// Sets how long disposing the tracks acquired from now on takes.
    pub fn delay_disposals(&self, delay: Duration) {
        self.dispose_delay.set(delay);
    }

    /// Sets the outcome of leaving the conferences created from now on.
    pub fn leave_with(&self, leave: Leave) {
        self.leave.set(leave);
    }

    /// Returns the engine connection created last.
    pub fn connection(&self) -> Rc<FakeConnection> {
        Rc::clone(self.connections.borrow().last().unwrap())
    }

    /// Returns the acquired local track of the provided `kind` created last.
    pub fn track(&self, kind: MediaKind) -> Rc<FakeTrack> {
        let tracks = self.tracks.borrow();
        Rc::clone(tracks.iter().rev().find(|t| t.kind == kind).unwrap())
    }
}

impl Engine for FakeEngine {
    fn init(&self, _: &conf::Engine) -> Result<(), EngineError> {
        self.init_calls.set(self.init_calls.get() + 1);
        Ok(())
    }

    fn new_connection(
        &self,
        config: &conf::Connection,
    ) -> Rc<dyn EngineConnection> {
        let connection = Rc::new(FakeConnection {
            config: config.clone(),
            listeners: Listeners::default(),
            connect_calls: Cell::new(0),
            disconnect_calls: Cell::new(0),
            conferences: RefCell::new(Vec::new()),
            options: RefCell::new(Vec::new()),
            leave: self.leave.get(),
        });
        self.connections.borrow_mut().push(Rc::clone(&connection));
        connection
    }

    fn create_local_tracks(
        &self,
        options: LocalTracksOptions,
    ) -> LocalBoxFuture<'static, Result<Vec<Rc<dyn MediaTrack>>, AcquisitionError>>
    {
        self.acquisitions.borrow_mut().push(options.clone());
        let delay =
            self.acquire_delays.borrow_mut().pop_front().unwrap_or_default();

        let failing = self.failing_kinds.borrow();
        if let Some(kind) =
            options.devices.iter().find(|k| failing.contains(k))
        {
            return delayed(
                delay,
                Err(AcquisitionError(format!(
                    "{} device is not available",
                    kind,
                ))),
            );
        }

        let mut acquired: Vec<Rc<dyn MediaTrack>> = Vec::new();
        for kind in &options.devices {
            let track =
                FakeTrack::new(*kind, None, true, self.dispose_delay.get());
            self.tracks.borrow_mut().push(Rc::clone(&track));
            acquired.push(track);
        }
        delayed(delay, Ok(acquired))
    }
}
