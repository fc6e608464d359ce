//! Best-effort pushing of local tracks onto an engine conference.

use std::rc::Rc;

use futures::future;

use crate::{
    engine::{EngineConference, EngineError},
    media::Track,
};

/// Adds the provided local `tracks` to the `conference`, skipping the ones
/// it has already.
///
/// Failures are logged and don't prevent the other tracks from being added.
pub async fn add_local_tracks(
    conference: Rc<dyn EngineConference>,
    tracks: Vec<Track>,
) {
    let present = conference.local_tracks();
    let adds = tracks
        .into_iter()
        .filter(|track| !present.iter().any(|p| track.is(p)))
        .map(|track| {
            let add = conference.add_track(Rc::clone(track.inner()));
            async move {
                if let Err(e) = add.await {
                    log::warn!(
                        "Failed to add local {} track to conference: {}",
                        track.kind(),
                        e,
                    );
                }
            }
        });
    future::join_all(adds).await;
}

/// Removes the provided local `tracks` from the `conference`.
///
/// Tracks disposed already are skipped silently, other failures are logged
/// and don't prevent the other tracks from being removed.
pub async fn remove_local_tracks(
    conference: Rc<dyn EngineConference>,
    tracks: Vec<Track>,
) {
    let removals = tracks.into_iter().map(|track| {
        let remove = conference.remove_track(Rc::clone(track.inner()));
        async move {
            match remove.await {
                Ok(()) | Err(EngineError::TrackIsDisposed) => (),
                Err(e) => log::warn!(
                    "Failed to remove local {} track from conference: {}",
                    track.kind(),
                    e,
                ),
            }
        }
    });
    future::join_all(removals).await;
}
