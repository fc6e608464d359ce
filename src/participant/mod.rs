//! Participants of a conference.

mod registry;

use std::{collections::BTreeMap, fmt, rc::Rc};

use conclave_reactive::ObservableCell;
use futures::stream::LocalBoxStream;

use crate::media::{MediaKind, Track};

#[doc(inline)]
pub use self::registry::ParticipantRegistry;

/// Presentation hint: position of a participant on a 2D plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Tracks of a [`Participant`] keyed by their [`MediaKind`].
pub type ParticipantTracks = BTreeMap<MediaKind, Track>;

/// Observable state of a single local or remote conference member.
///
/// Cloning a [`Participant`] yields another handle to the same record.
#[derive(Clone)]
pub struct Participant(Rc<Inner>);

struct Inner {
    /// Engine-assigned identity. Set once.
    jid: ObservableCell<Option<String>>,
    role: ObservableCell<Option<String>>,
    audio_level: ObservableCell<f64>,
    audio_enabled: ObservableCell<bool>,
    video_enabled: ObservableCell<bool>,
    screen_enabled: ObservableCell<bool>,
    position: ObservableCell<Option<Position>>,
    size: ObservableCell<Option<f64>>,
    visible: ObservableCell<bool>,
    is_local: bool,
    tracks: ObservableCell<ParticipantTracks>,
}

impl Participant {
    /// Creates a new [`Participant`] with no identity.
    #[must_use]
    pub fn new(is_local: bool) -> Self {
        Self(Rc::new(Inner {
            jid: ObservableCell::new(None),
            role: ObservableCell::new(None),
            audio_level: ObservableCell::new(0.0),
            audio_enabled: ObservableCell::new(false),
            video_enabled: ObservableCell::new(false),
            screen_enabled: ObservableCell::new(false),
            position: ObservableCell::new(None),
            size: ObservableCell::new(None),
            visible: ObservableCell::new(false),
            is_local,
            tracks: ObservableCell::new(ParticipantTracks::new()),
        }))
    }

    #[inline]
    pub fn jid(&self) -> Option<String> {
        self.0.jid.get()
    }

    #[inline]
    pub fn on_jid_change(&self) -> LocalBoxStream<'static, Option<String>> {
        self.0.jid.subscribe()
    }

    /// Sets the identity of this [`Participant`].
    ///
    /// The identity is immutable once set: returns `false` and keeps the
    /// current one if it differs from the provided `jid`.
    pub fn set_jid(&self, jid: String) -> bool {
        let current = self.0.jid.borrow().clone();
        match current {
            None => {
                self.0.jid.set(Some(jid));
                true
            }
            Some(current) if current == jid => true,
            Some(current) => {
                log::warn!(
                    "Participant `{}` cannot be renamed to `{}`",
                    current,
                    jid,
                );
                false
            }
        }
    }

    #[inline]
    pub fn role(&self) -> Option<String> {
        self.0.role.get()
    }

    #[inline]
    pub fn set_role(&self, role: String) {
        self.0.role.set(Some(role));
    }

    #[inline]
    pub fn on_role_change(&self) -> LocalBoxStream<'static, Option<String>> {
        self.0.role.subscribe()
    }

    #[inline]
    pub fn audio_level(&self) -> f64 {
        self.0.audio_level.get()
    }

    /// Sets the audio level of this [`Participant`], clamping negative
    /// values to zero.
    #[inline]
    pub fn set_audio_level(&self, level: f64) {
        self.0.audio_level.set(level.max(0.0));
    }

    #[inline]
    pub fn on_audio_level_change(&self) -> LocalBoxStream<'static, f64> {
        self.0.audio_level.subscribe()
    }

    #[inline]
    pub fn audio_enabled(&self) -> bool {
        self.0.audio_enabled.get()
    }

    #[inline]
    pub fn set_audio_enabled(&self, enabled: bool) {
        self.0.audio_enabled.set(enabled);
    }

    #[inline]
    pub fn video_enabled(&self) -> bool {
        self.0.video_enabled.get()
    }

    #[inline]
    pub fn set_video_enabled(&self, enabled: bool) {
        self.0.video_enabled.set(enabled);
    }

    #[inline]
    pub fn screen_enabled(&self) -> bool {
        self.0.screen_enabled.get()
    }

    #[inline]
    pub fn set_screen_enabled(&self, enabled: bool) {
        self.0.screen_enabled.set(enabled);
    }

    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.0.position.get()
    }

    #[inline]
    pub fn set_position(&self, position: Option<Position>) {
        self.0.position.set(position);
    }

    #[inline]
    pub fn size(&self) -> Option<f64> {
        self.0.size.get()
    }

    #[inline]
    pub fn set_size(&self, size: Option<f64>) {
        self.0.size.set(size);
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.0.visible.get()
    }

    #[inline]
    pub fn set_visible(&self, visible: bool) {
        self.0.visible.set(visible);
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        self.0.is_local
    }

    #[inline]
    pub fn tracks(&self) -> ParticipantTracks {
        self.0.tracks.get()
    }

    #[inline]
    pub fn track(&self, kind: MediaKind) -> Option<Track> {
        self.0.tracks.borrow().get(&kind).cloned()
    }

    #[inline]
    pub fn on_tracks_change(
        &self,
    ) -> LocalBoxStream<'static, ParticipantTracks> {
        self.0.tracks.subscribe()
    }

    /// Adds the provided `track` under its kind, replacing the track of the
    /// same kind, if any.
    pub fn add_track(&self, track: Track) {
        let kind = track.kind();
        self.0.tracks.mutate(|tracks| drop(tracks.insert(kind, track)));
    }

    /// Removes the stored track of the provided `track`'s kind if it has the
    /// same [`MediaTrack::id`]. The engine may hand out distinct objects for
    /// one track.
    ///
    /// Nothing is removed if another track of the same kind has replaced it
    /// already. Returns whether a track has been removed.
    ///
    /// [`MediaTrack::id`]: crate::engine::MediaTrack::id
    pub fn remove_track(&self, track: &Track) -> bool {
        let kind = track.kind();
        let id = track.id();
        self.0.tracks.mutate(|tracks| {
            if tracks.get(&kind).map_or(false, |t| t.id() == id) {
                drop(tracks.remove(&kind));
                true
            } else {
                false
            }
        })
    }

    /// Removes the track of the provided `kind`, if any.
    pub fn remove_track_kind(&self, kind: MediaKind) -> Option<Track> {
        self.0.tracks.mutate(|tracks| tracks.remove(&kind))
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Participant {}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("jid", &self.jid())
            .field("role", &self.role())
            .field("is_local", &self.is_local())
            .field("tracks", &self.0.tracks.borrow().keys())
            .finish()
    }
}
