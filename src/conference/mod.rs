//! Lifecycle of a single conference ("room").

mod tracks;

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    ops::Deref,
    rc::{Rc, Weak},
};

use conclave_reactive::ObservableCell;
use derive_more::Display;
use futures::{
    stream::{self, LocalBoxStream},
    StreamExt as _,
};
use tracerr::Traced;

use crate::{
    conf,
    connection::{LiveConnection, WeakConnection},
    engine::{
        BridgeChannel, ConferenceEvent, ConferenceOptions, EngineConference,
        EngineError, EngineEvent, EventName, MediaTrack,
    },
    media::{LocalTracks, Track},
    participant::{Participant, ParticipantRegistry},
    platform,
    utils::{
        spawn_abortable, ConclaveError, EventSpec, HandlerDetachedError,
        TaskHandle, TrackDirection, Wiring,
    },
};

/// State of a [`Conference`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ConferenceState {
    #[display(fmt = "initial")]
    Initial,

    #[display(fmt = "joining")]
    Joining,

    #[display(fmt = "joined")]
    Joined,

    #[display(fmt = "leaving")]
    Leaving,

    #[display(fmt = "left")]
    Left,

    #[display(fmt = "failed")]
    Failed,

    #[display(fmt = "error")]
    Error,

    #[display(fmt = "kicked")]
    Kicked,
}

/// Joined [`EngineConference`].
///
/// Two [`LiveConference`]s are equal only if they reference the same engine
/// conference.
#[derive(Clone, Debug)]
pub struct LiveConference(Rc<dyn EngineConference>);

impl LiveConference {
    /// Returns the underlying engine conference.
    #[inline]
    pub fn inner(&self) -> &Rc<dyn EngineConference> {
        &self.0
    }
}

impl PartialEq for LiveConference {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
    }
}

impl Deref for LiveConference {
    type Target = dyn EngineConference;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Engine conference created for a single live connection, along with its
/// listeners and participants.
struct Instance {
    conference: Rc<dyn EngineConference>,
    wiring: Rc<Wiring<dyn EngineConference>>,

    /// Live connection the `conference` was created on.
    origin: LiveConnection,

    /// Local tracks pushed onto the `conference`.
    pushed: Vec<Track>,
}

/// Observable conference derived from the live engine connection of a
/// [`Connection`].
///
/// Whenever the live engine connection changes, the engine conference
/// created on the previous one is torn down, and a new one is joined if the
/// connection is live.
///
/// [`Connection`]: crate::connection::Connection
#[derive(Clone)]
pub struct Conference(Rc<Inner>);

struct Inner {
    id: String,
    connection: WeakConnection,
    local_tracks: LocalTracks,
    timeouts: conf::Timeouts,
    state: ObservableCell<ConferenceState>,
    live: ObservableCell<Option<LiveConference>>,
    permit_entry: ObservableCell<bool>,

    /// Code of the last engine-reported conference error.
    last_error: Cell<Option<i32>>,

    /// Local user within the current engine conference.
    local: RefCell<Participant>,

    /// Remote participants of the current engine conference.
    remote: RefCell<Rc<ParticipantRegistry>>,

    /// Participants with a known identity, keyed by it.
    participants: ObservableCell<HashMap<String, Participant>>,

    current: RefCell<Option<Instance>>,

    /// Number of the engine conference created last. Events of the older
    /// ones don't affect the state.
    generation: Cell<u64>,

    watchers: RefCell<Vec<TaskHandle>>,
}

impl Conference {
    /// Creates a new [`Conference`] for the room `id` on the provided
    /// `connection`.
    ///
    /// The room is joined as soon as the `connection` is live.
    pub fn join(
        id: String,
        connection: WeakConnection,
        local_tracks: LocalTracks,
        timeouts: conf::Timeouts,
    ) -> Self {
        let live_changes = connection.upgrade().map(|c| c.on_live_change());
        let inner = Rc::new(Inner {
            id,
            connection,
            local_tracks,
            timeouts,
            state: ObservableCell::new(ConferenceState::Initial),
            live: ObservableCell::new(None),
            permit_entry: ObservableCell::new(false),
            last_error: Cell::new(None),
            local: RefCell::new(Participant::new(true)),
            remote: RefCell::new(Rc::new(ParticipantRegistry::new())),
            participants: ObservableCell::new(HashMap::new()),
            current: RefCell::new(None),
            generation: Cell::new(0),
            watchers: RefCell::new(Vec::new()),
        });
        if let Some(live_changes) = live_changes {
            inner.spawn_derivation(live_changes);
        }
        inner.spawn_tracks_sync();

        Self(inner)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    #[inline]
    pub fn state(&self) -> ConferenceState {
        self.0.state.get()
    }

    /// Streams the [`ConferenceState`], starting with the current one.
    #[inline]
    pub fn on_state_change(&self) -> LocalBoxStream<'static, ConferenceState> {
        self.0.state.subscribe()
    }

    /// Returns the joined engine conference, if any.
    #[inline]
    pub fn live(&self) -> Option<LiveConference> {
        self.0.live.get()
    }

    #[inline]
    pub fn on_live_change(
        &self,
    ) -> LocalBoxStream<'static, Option<LiveConference>> {
        self.0.live.subscribe()
    }

    /// Returns the code of the last engine-reported error.
    #[inline]
    pub fn last_error(&self) -> Option<i32> {
        self.0.last_error.get()
    }

    /// Allows or forbids pushing local tracks onto the conference.
    #[inline]
    pub fn permit_entry(&self, permit: bool) {
        self.0.permit_entry.set(permit);
    }

    #[inline]
    pub fn is_entry_permitted(&self) -> bool {
        self.0.permit_entry.get()
    }

    /// Returns the local user within the current engine conference.
    #[inline]
    pub fn local_participant(&self) -> Participant {
        self.0.local.borrow().clone()
    }

    /// Returns the remote participant with the provided engine-side `id`.
    #[inline]
    pub fn remote(&self, id: &str) -> Option<Participant> {
        self.0.remote.borrow().get(id)
    }

    /// Returns the remote participants of the current engine conference.
    #[inline]
    pub fn remote_participants(&self) -> Rc<ParticipantRegistry> {
        Rc::clone(&self.0.remote.borrow())
    }

    /// Returns all the participants with a known identity, keyed by it.
    ///
    /// Empty unless the conference is joined.
    #[inline]
    pub fn participants(&self) -> HashMap<String, Participant> {
        self.0.participants.get()
    }

    #[inline]
    pub fn on_participants_change(
        &self,
    ) -> LocalBoxStream<'static, HashMap<String, Participant>> {
        self.0.participants.subscribe()
    }

    /// Leaves the conference and stops following the connection.
    pub fn dispose(&self) {
        drop(self.0.watchers.take());
        self.0.teardown();
    }
}

impl fmt::Debug for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conference")
            .field("id", &self.0.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    /// Re-creates the engine conference on every change of the live
    /// connection.
    fn spawn_derivation(
        self: &Rc<Self>,
        mut live_changes: LocalBoxStream<'static, Option<LiveConnection>>,
    ) {
        let weak = Rc::downgrade(self);
        let task = spawn_abortable(async move {
            while let Some(live) = live_changes.next().await {
                let this = match weak.upgrade() {
                    Some(this) => this,
                    None => return,
                };
                this.teardown();
                if let Some(origin) = live {
                    this.start(origin);
                }
            }
            if let Some(this) = weak.upgrade() {
                this.teardown();
            }
        });
        self.watchers.borrow_mut().push(task);
    }

    /// Keeps local tracks pushed onto the joined engine conference.
    fn spawn_tracks_sync(self: &Rc<Self>) {
        let changes = stream::select_all(vec![
            self.live.subscribe().map(drop).boxed_local(),
            self.local_tracks.on_change().map(drop).boxed_local(),
            self.permit_entry.subscribe().map(drop).boxed_local(),
        ]);
        let weak = Rc::downgrade(self);
        let task = spawn_abortable(changes.for_each(move |()| {
            if let Some(this) = weak.upgrade() {
                this.sync_local_tracks();
            }
            futures::future::ready(())
        }));
        self.watchers.borrow_mut().push(task);
    }

    /// Creates and joins a new engine conference on the provided live
    /// connection.
    fn start(self: &Rc<Self>, origin: LiveConnection) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.local.borrow_mut() = Participant::new(true);
        *self.remote.borrow_mut() = Rc::new(ParticipantRegistry::new());
        self.last_error.set(None);

        let conference = origin.init_conference(
            &self.id,
            ConferenceOptions {
                open_bridge_channel: BridgeChannel::WebSocket,
            },
        );
        let weak = Rc::downgrade(self);
        let wiring = Rc::new_cyclic(|own| {
            Wiring::new(
                Rc::clone(&conference),
                event_spec(&weak, generation, own),
            )
        });
        wiring.attach();
        *self.current.borrow_mut() = Some(Instance {
            conference: Rc::clone(&conference),
            wiring,
            origin,
            pushed: Vec::new(),
        });

        self.set_status(ConferenceState::Joining, &conference);
        conference.join();
    }

    /// Updates the [`ConferenceState`], exposing the provided engine
    /// `conference` only if [`ConferenceState::Joined`].
    fn set_status(
        &self,
        state: ConferenceState,
        conference: &Rc<dyn EngineConference>,
    ) {
        if state == ConferenceState::Joining {
            let _ = self.local.borrow().set_jid(conference.my_user_id());
        }
        let live = if state == ConferenceState::Joined {
            Some(LiveConference(Rc::clone(conference)))
        } else {
            None
        };
        self.live.set(live);
        self.state.set(state);
        self.refresh_participants();
    }

    /// Recomputes [`Conference::participants`].
    fn refresh_participants(&self) {
        let mut view = HashMap::new();
        if self.live.borrow().is_some() {
            for (_, participant) in self.remote.borrow().participants() {
                if let Some(jid) = participant.jid() {
                    drop(view.insert(jid, participant));
                }
            }
            let local = self.local.borrow().clone();
            if let Some(jid) = local.jid() {
                drop(view.insert(jid, local));
            }
        }
        self.participants.set(view);
    }

    /// Leaves the current engine conference, if any.
    fn teardown(self: &Rc<Self>) {
        let instance = match self.current.borrow_mut().take() {
            Some(instance) => instance,
            None => return,
        };
        let Instance {
            conference,
            wiring,
            origin,
            ..
        } = instance;

        match self.state.get() {
            ConferenceState::Joining | ConferenceState::Joined => {
                let origin_is_live = self
                    .connection
                    .upgrade()
                    .and_then(|c| c.live())
                    .map_or(false, |live| live == origin);
                if origin_is_live {
                    self.set_status(ConferenceState::Leaving, &conference);
                    self.leave(&conference, &wiring);
                } else {
                    self.set_status(ConferenceState::Left, &conference);
                    wiring.detach();
                }
            }
            _ => {
                wiring.detach();
                self.set_status(ConferenceState::Left, &conference);
            }
        }
    }

    /// Asks the engine to leave the provided `conference`, detaching its
    /// listeners after [`conf::Timeouts::listeners_cleanup`] at the latest.
    ///
    /// Finalization happens on [`ConferenceEvent::Left`] unless leaving
    /// fails.
    fn leave(
        self: &Rc<Self>,
        conference: &Rc<dyn EngineConference>,
        wiring: &Rc<Wiring<dyn EngineConference>>,
    ) {
        let generation = self.generation.get();
        let leaving = conference.leave();
        let this = Rc::clone(self);
        let conference = Rc::clone(conference);
        let on_failure = Rc::clone(wiring);
        platform::spawn(async move {
            match leaving.await {
                Ok(()) => log::info!("Left conference `{}`", this.id),
                Err(EngineError::TrackIsDisposed) => (),
                Err(e) => {
                    log::warn!(
                        "Error when leaving conference `{}`: {}",
                        this.id,
                        e,
                    );
                    on_failure.detach();
                    if this.generation.get() == generation {
                        this.set_status(ConferenceState::Left, &conference);
                    }
                }
            }
        });

        let timeout = self.timeouts.listeners_cleanup;
        let fallback = Rc::clone(wiring);
        platform::spawn(async move {
            platform::delay_for(timeout).await;
            fallback.detach();
        });
    }

    /// Handles the provided [`EngineEvent`] of the engine conference number
    /// `generation`.
    fn handle_event(&self, generation: u64, event: EngineEvent) {
        if generation != self.generation.get() {
            log::debug!("Ignoring {} of a superseded conference", event.name());
            return;
        }
        let event = match event {
            EngineEvent::Conference(event) => event,
            _ => {
                log::warn!("Unexpected {} on conference", event.name());
                return;
            }
        };
        let conference = match self.current.borrow().as_ref() {
            Some(instance) => Rc::clone(&instance.conference),
            None => {
                // Torn down already: only finalization matters.
                if let ConferenceEvent::Left = event {
                    self.state.set(ConferenceState::Left);
                }
                return;
            }
        };

        match event {
            ConferenceEvent::Joined => {
                self.set_status(ConferenceState::Joined, &conference);
            }
            ConferenceEvent::Left => {
                self.set_status(ConferenceState::Left, &conference);
            }
            ConferenceEvent::Failed => {
                self.set_status(ConferenceState::Failed, &conference);
            }
            ConferenceEvent::Error(code) => {
                log::error!("Conference `{}` error: {}", self.id, code);
                self.last_error.set(Some(code));
                self.set_status(ConferenceState::Error, &conference);
            }
            ConferenceEvent::Kicked => {
                self.set_status(ConferenceState::Kicked, &conference);
            }
            ConferenceEvent::UserJoined { id, participant } => {
                self.remote.borrow().update_participant(&id, |p, _| {
                    let _ = p.set_jid(participant.id);
                    p.set_role(participant.role);
                });
                self.refresh_participants();
            }
            ConferenceEvent::UserLeft { id } => {
                drop(self.remote.borrow().remove(&id));
                self.refresh_participants();
            }
            ConferenceEvent::UserRoleChanged { id, role } => {
                let local = self.local.borrow().clone();
                if local.jid().as_deref() == Some(id.as_str()) {
                    local.set_role(role);
                } else {
                    self.remote
                        .borrow()
                        .update_participant(&id, |p, _| p.set_role(role));
                }
                self.refresh_participants();
            }
            ConferenceEvent::TrackAdded(track) => {
                self.route_track(track, TrackDirection::Add);
            }
            ConferenceEvent::TrackRemoved(track) => {
                self.route_track(track, TrackDirection::Remove);
            }
            ConferenceEvent::TrackAudioLevelChanged {
                participant_id,
                level,
            } => {
                let local = self.local.borrow().clone();
                if local.jid().as_deref() == Some(participant_id.as_str()) {
                    local.set_audio_level(level);
                } else {
                    let remote = self.remote.borrow().get(&participant_id);
                    if let Some(p) = remote {
                        p.set_audio_level(level);
                    }
                }
            }
        }
    }

    /// Adds or removes the provided `track` to or from its owner.
    fn route_track(
        &self,
        track: Rc<dyn MediaTrack>,
        direction: TrackDirection,
    ) {
        let track = Track::new(track);
        let apply = |p: &Participant| match direction {
            TrackDirection::Add => p.add_track(track.clone()),
            TrackDirection::Remove => drop(p.remove_track(&track)),
        };

        if track.is_local() {
            let local = self.local.borrow().clone();
            apply(&local);
        } else if let Some(id) = track.participant_id() {
            self.remote.borrow().update_participant(&id, |p, _| apply(p));
        } else {
            log::warn!("Track does not have participant ID: {:?}", track);
            return;
        }
        self.refresh_participants();
    }

    /// Pushes the local tracks onto the joined engine conference if entry is
    /// permitted, and pulls the ones no longer wanted.
    fn sync_local_tracks(&self) {
        if self.live.borrow().is_none() {
            return;
        }
        let wanted: Vec<Track> = if self.permit_entry.get() {
            self.local_tracks.tracks().into_iter().map(|(_, t)| t).collect()
        } else {
            Vec::new()
        };

        let mut current = self.current.borrow_mut();
        let instance = match current.as_mut() {
            Some(instance) => instance,
            None => return,
        };
        let conference = Rc::clone(&instance.conference);
        let unwanted: Vec<Track> = instance
            .pushed
            .iter()
            .filter(|t| !wanted.contains(t))
            .cloned()
            .collect();
        instance.pushed = wanted.clone();
        drop(current);

        let local = self.local.borrow().clone();
        for track in &unwanted {
            drop(local.remove_track(track));
        }
        for track in &wanted {
            local.add_track(track.clone());
        }

        if !unwanted.is_empty() {
            platform::spawn(tracks::remove_local_tracks(
                Rc::clone(&conference),
                unwanted,
            ));
        }
        if !wanted.is_empty() {
            platform::spawn(tracks::add_local_tracks(conference, wanted));
        }
    }
}

/// Builds listeners of the engine conference number `generation`.
///
/// Leaving always detaches the listeners of its own engine conference, even
/// if it is superseded already.
fn event_spec(
    weak: &Weak<Inner>,
    generation: u64,
    own: &Weak<Wiring<dyn EngineConference>>,
) -> EventSpec {
    let weak = weak.clone();
    let own = own.clone();
    let listener = move |event: EngineEvent| {
        if let EngineEvent::Conference(ConferenceEvent::Left) = event {
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

    [
        EventName::ConferenceJoined,
        EventName::ConferenceLeft,
        EventName::ConferenceFailed,
        EventName::ConferenceError,
        EventName::Kicked,
        EventName::UserJoined,
        EventName::UserLeft,
        EventName::UserRoleChanged,
        EventName::TrackAdded,
        EventName::TrackRemoved,
        EventName::TrackAudioLevelChanged,
    ]
    .iter()
    .fold(EventSpec::new(), |spec, name| spec.on(*name, listener.clone()))
}
