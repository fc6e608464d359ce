//! Acquisition and release of the local user's media tracks.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use conclave_reactive::ObservableCell;
use futures::{future, stream::LocalBoxStream};

use crate::{
    engine::{
        EngineError, EngineEvent, EngineHandle, EventName, LocalTracksOptions,
        MediaTrack, TrackEvent,
    },
    utils::{EventSpec, Wiring},
};

use super::{MediaKind, Track};

/// Local tracks keyed by their [`MediaKind`].
pub type LocalTrackSet = BTreeMap<MediaKind, Track>;

/// Devices preferred for the local tracks acquisition.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectedDevices {
    /// ID of the preferred microphone.
    pub audio_input: Option<String>,

    /// ID of the preferred camera.
    pub video_input: Option<String>,
}

/// Local user's media tracks, shared by all the conferences.
///
/// At most one [`LocalTrackSet`] is live at a time: the previous set is
/// released before a newly acquired one is installed. Of overlapping
/// requests only the latest one installs its tracks.
#[derive(Clone)]
pub struct LocalTracks(Rc<Inner>);

struct Inner {
    engine: EngineHandle,

    /// Currently installed tracks.
    tracks: ObservableCell<LocalTrackSet>,

    /// Audio level listeners of the installed audio tracks.
    level_wirings: RefCell<Vec<Wiring<dyn MediaTrack>>>,

    /// Audio level of the local microphone.
    audio_level: ObservableCell<f64>,

    /// Whether audio is acquired by [`LocalTracks::request`] without explicit
    /// kinds.
    audio_requested: ObservableCell<bool>,

    /// Whether video is acquired by [`LocalTracks::request`] without explicit
    /// kinds.
    video_requested: ObservableCell<bool>,

    selected_devices: RefCell<SelectedDevices>,

    /// Bumped by every [`LocalTracks::request`] and [`LocalTracks::clear`].
    generation: Cell<u64>,
}

impl LocalTracks {
    /// Creates empty [`LocalTracks`] acquiring tracks from the provided
    /// engine.
    #[must_use]
    pub fn new(engine: EngineHandle) -> Self {
        Self(Rc::new(Inner {
            engine,
            tracks: ObservableCell::new(LocalTrackSet::new()),
            level_wirings: RefCell::new(Vec::new()),
            audio_level: ObservableCell::new(0.0),
            audio_requested: ObservableCell::new(true),
            video_requested: ObservableCell::new(true),
            selected_devices: RefCell::new(SelectedDevices::default()),
            generation: Cell::new(0),
        }))
    }

    /// Acquires new local tracks and installs them instead of the current
    /// ones.
    ///
    /// `None` `kinds` requests the kinds enabled with
    /// [`LocalTracks::set_requested`]; `None` `devices` uses the devices
    /// chosen with [`LocalTracks::select_devices`].
    ///
    /// Tries to acquire all the kinds at once, falling back to acquiring
    /// them one by one if that fails. Kinds which cannot be acquired are
    /// logged and omitted.
    ///
    /// Returns `true` if at least one track has been acquired.
    pub async fn request(
        &self,
        kinds: Option<Vec<MediaKind>>,
        devices: Option<SelectedDevices>,
    ) -> bool {
        let kinds = kinds.unwrap_or_else(|| self.requested_kinds());
        let devices =
            devices.unwrap_or_else(|| self.0.selected_devices.borrow().clone());

        let generation = self.next_generation();
        let acquired = self.acquire(&kinds, &devices).await;
        if self.is_current(generation) {
            self.release().await;
        }
        if !self.is_current(generation) {
            log::debug!("Local tracks request superseded, disposing result");
            dispose_tracks(acquired.into_iter().map(Track::new)).await;
            return false;
        }

        let mut set = LocalTrackSet::new();
        let mut wirings = Vec::new();
        for track in acquired {
            if track.kind() == MediaKind::Audio {
                let wiring = Wiring::new(Rc::clone(&track), self.level_spec());
                wiring.attach();
                wirings.push(wiring);
            }
            drop(set.insert(track.kind(), Track::new(track)));
        }
        let acquired_any = !set.is_empty();
        *self.0.level_wirings.borrow_mut() = wirings;
        self.0.tracks.set(set);

        acquired_any
    }

    /// Releases the installed tracks: detaches their audio level listeners
    /// and disposes them.
    ///
    /// Pending [`LocalTracks::request`]s are discarded.
    pub async fn clear(&self) {
        let _ = self.next_generation();
        self.release().await;
    }

    async fn release(&self) {
        for wiring in self.0.level_wirings.take() {
            wiring.detach();
        }
        let released = self.0.tracks.replace(LocalTrackSet::new());
        self.0.audio_level.set(0.0);

        dispose_tracks(released.into_iter().map(|(_, track)| track)).await;
    }

    fn next_generation(&self) -> u64 {
        let generation = self.0.generation.get().wrapping_add(1);
        self.0.generation.set(generation);
        generation
    }

    #[inline]
    fn is_current(&self, generation: u64) -> bool {
        self.0.generation.get() == generation
    }

    /// Returns the number of the installed tracks.
    #[inline]
    pub fn count(&self) -> usize {
        self.0.tracks.borrow().len()
    }

    /// Returns the installed tracks.
    #[inline]
    pub fn tracks(&self) -> LocalTrackSet {
        self.0.tracks.get()
    }

    /// Streams the installed tracks, starting with the current ones.
    #[inline]
    pub fn on_change(&self) -> LocalBoxStream<'static, LocalTrackSet> {
        self.0.tracks.subscribe()
    }

    #[inline]
    pub fn audio_level(&self) -> f64 {
        self.0.audio_level.get()
    }

    #[inline]
    pub fn on_audio_level_change(&self) -> LocalBoxStream<'static, f64> {
        self.0.audio_level.subscribe()
    }

    /// Enables or disables the provided `kind` for the requests without
    /// explicit kinds.
    ///
    /// Only [`MediaKind::Audio`] and [`MediaKind::Video`] can be toggled.
    pub fn set_requested(&self, kind: MediaKind, requested: bool) {
        match kind {
            MediaKind::Audio => self.0.audio_requested.set(requested),
            MediaKind::Video => self.0.video_requested.set(requested),
            MediaKind::Desktop => {
                log::warn!("Desktop track cannot be requested by default");
            }
        }
    }

    /// Returns the kinds acquired by the requests without explicit kinds.
    pub fn requested_kinds(&self) -> Vec<MediaKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.0.audio_requested.get() {
            kinds.push(MediaKind::Audio);
        }
        if self.0.video_requested.get() {
            kinds.push(MediaKind::Video);
        }
        kinds
    }

    /// Sets the devices used by the requests without explicit devices.
    #[inline]
    pub fn select_devices(&self, devices: SelectedDevices) {
        *self.0.selected_devices.borrow_mut() = devices;
    }

    #[inline]
    pub fn selected_devices(&self) -> SelectedDevices {
        self.0.selected_devices.borrow().clone()
    }

    /// Acquires tracks of the provided `kinds` at once, falling back to
    /// acquiring them one by one.
    async fn acquire(
        &self,
        kinds: &[MediaKind],
        devices: &SelectedDevices,
    ) -> Vec<Rc<dyn MediaTrack>> {
        let engine = self.0.engine.engine();

        let batch = engine
            .create_local_tracks(acquisition_options(kinds, devices))
            .await;
        match batch {
            Ok(tracks) => tracks,
            Err(e) if kinds.len() > 1 => {
                log::debug!(
                    "Failed to acquire {:?} at once, acquiring one by one: {}",
                    kinds,
                    e,
                );
                let mut tracks = Vec::new();
                for kind in kinds {
                    let single = engine
                        .create_local_tracks(acquisition_options(
                            &[*kind],
                            devices,
                        ))
                        .await;
                    match single {
                        Ok(acquired) => tracks.extend(acquired),
                        Err(e) => {
                            log::warn!(
                                "Unable to create local {} track: {}",
                                kind,
                                e,
                            );
                        }
                    }
                }
                tracks
            }
            Err(e) => {
                log::warn!("Unable to create local track {:?}: {}", kinds, e);
                Vec::new()
            }
        }
    }

    /// Builds the [`EventSpec`] mirroring track audio levels into
    /// [`LocalTracks::audio_level`].
    fn level_spec(&self) -> EventSpec {
        let weak: Weak<Inner> = Rc::downgrade(&self.0);
        EventSpec::new().on(EventName::AudioLevelChanged, move |event| {
            if let EngineEvent::Track(TrackEvent::AudioLevelChanged(level)) =
                event
            {
                if let Some(inner) = weak.upgrade() {
                    inner.audio_level.set(level.max(0.0));
                }
            }
        })
    }
}

/// Disposes the provided tracks concurrently. Failures are logged.
async fn dispose_tracks<I>(tracks: I)
where
    I: IntoIterator<Item = Track>,
{
    let disposals = tracks.into_iter().map(|track| async move {
        match track.dispose().await {
            Ok(()) | Err(EngineError::TrackIsDisposed) => (),
            Err(e) => {
                log::warn!(
                    "Failed to dispose local {} track: {}",
                    track.kind(),
                    e,
                );
            }
        }
    });
    future::join_all(disposals).await;
}

/// Builds [`LocalTracksOptions`] for the provided `kinds`.
///
/// Device IDs are only passed for the kinds being acquired.
fn acquisition_options(
    kinds: &[MediaKind],
    devices: &SelectedDevices,
) -> LocalTracksOptions {
    LocalTracksOptions {
        devices: kinds.to_vec(),
        camera_device_id: devices
            .video_input
            .clone()
            .filter(|_| kinds.contains(&MediaKind::Video)),
        mic_device_id: devices
            .audio_input
            .clone()
            .filter(|_| kinds.contains(&MediaKind::Audio)),
    }
}
