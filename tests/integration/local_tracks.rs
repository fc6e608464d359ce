use std::{rc::Rc, time::Duration};

use conclave::{
    engine::{EngineHandle, MediaTrack as _, TrackEvent},
    media::SelectedDevices,
    LocalTracks, MediaKind,
};
use futures::StreamExt as _;
use tokio::time;

use crate::{engine::FakeEngine, local};

fn local_tracks() -> (Rc<FakeEngine>, LocalTracks) {
    let engine = Rc::new(FakeEngine::default());
    let tracks = LocalTracks::new(EngineHandle::new(engine.clone()));
    (engine, tracks)
}

#[tokio::test]
async fn acquires_requested_kinds_at_once() {
    local(async {
        let (engine, tracks) = local_tracks();

        assert!(tracks.request(None, None).await);

        assert_eq!(tracks.count(), 2);
        let acquisitions = engine.acquisitions.borrow();
        assert_eq!(acquisitions.len(), 1);
        assert_eq!(
            acquisitions[0].devices,
            vec![MediaKind::Audio, MediaKind::Video],
        );
    })
    .await;
}

#[tokio::test]
async fn falls_back_to_acquiring_kinds_one_by_one() {
    local(async {
        let (engine, tracks) = local_tracks();
        engine.fail_kind(MediaKind::Video);

        assert!(tracks.request(None, None).await);

        assert_eq!(tracks.count(), 1);
        assert!(tracks.tracks().contains_key(&MediaKind::Audio));
        let kinds: Vec<_> = engine
            .acquisitions
            .borrow()
            .iter()
            .map(|o| o.devices.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                vec![MediaKind::Audio, MediaKind::Video],
                vec![MediaKind::Audio],
                vec![MediaKind::Video],
            ],
        );
    })
    .await;
}

#[tokio::test]
async fn single_kind_failure_yields_nothing() {
    local(async {
        let (engine, tracks) = local_tracks();
        engine.fail_kind(MediaKind::Audio);

        assert!(!tracks.request(Some(vec![MediaKind::Audio]), None).await);

        assert_eq!(tracks.count(), 0);
        assert_eq!(engine.acquisitions.borrow().len(), 1);
    })
    .await;
}

#[tokio::test]
async fn releases_previous_tracks_before_installing_new_ones() {
    local(async {
        let (engine, tracks) = local_tracks();
        assert!(tracks.request(None, None).await);
        let old_audio = engine.track(MediaKind::Audio);
        let old_video = engine.track(MediaKind::Video);

        let mut changes = tracks.on_change();
        assert_eq!(changes.next().await.unwrap().len(), 2);

        assert!(tracks.request(Some(vec![MediaKind::Video]), None).await);

        assert!(old_audio.is_disposed());
        assert!(old_video.is_disposed());
        assert!(changes.next().await.unwrap().is_empty());
        let installed = changes.next().await.unwrap();
        assert_eq!(installed.len(), 1);
        assert!(installed.contains_key(&MediaKind::Video));
    })
    .await;
}

#[tokio::test]
async fn mirrors_audio_level_of_audio_track() {
    local(async {
        let (engine, tracks) = local_tracks();
        assert!(tracks.request(None, None).await);
        let audio = engine.track(MediaKind::Audio);
        let video = engine.track(MediaKind::Video);
        assert_eq!(audio.listeners.len(), 1);
        assert!(video.listeners.is_empty());

        audio.listeners.emit(TrackEvent::AudioLevelChanged(0.4));
        assert!((tracks.audio_level() - 0.4).abs() < f64::EPSILON);

        tracks.clear().await;
        assert!(audio.listeners.is_empty());
        assert_eq!(tracks.audio_level(), 0.0);
        assert_eq!(tracks.count(), 0);
    })
    .await;
}

#[tokio::test]
async fn uses_requested_kinds_and_selected_devices() {
    local(async {
        let (engine, tracks) = local_tracks();
        tracks.set_requested(MediaKind::Video, false);
        tracks.select_devices(SelectedDevices {
            audio_input: Some("mic-1".into()),
            video_input: Some("cam-1".into()),
        });

        assert!(tracks.request(None, None).await);

        let acquisitions = engine.acquisitions.borrow();
        assert_eq!(acquisitions[0].devices, vec![MediaKind::Audio]);
        assert_eq!(acquisitions[0].mic_device_id.as_deref(), Some("mic-1"));
        assert_eq!(acquisitions[0].camera_device_id, None);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn superseded_request_disposes_its_own_tracks() {
    local(async {
        let (engine, tracks) = local_tracks();
        engine.delay_disposals(Duration::from_millis(50));
        assert!(tracks.request(None, None).await);
        let initial_audio = engine.track(MediaKind::Audio);
        let initial_video = engine.track(MediaKind::Video);
        engine.delay_acquisitions(vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
        ]);

        // The first request is still releasing the initial tracks when the
        // second one installs its own.
        let (first, second) = futures::join!(
            tracks.request(Some(vec![MediaKind::Audio]), None),
            async {
                time::sleep(Duration::from_millis(15)).await;
                tracks.request(Some(vec![MediaKind::Video]), None).await
            },
        );

        assert!(!first);
        assert!(second);
        let stale_audio = engine.track(MediaKind::Audio);
        let video = engine.track(MediaKind::Video);
        assert!(initial_audio.is_disposed());
        assert!(initial_video.is_disposed());
        assert!(stale_audio.is_disposed());
        assert!(!video.is_disposed());
        let installed = tracks.tracks();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[&MediaKind::Video].id(), video.id());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn clear_discards_pending_request() {
    local(async {
        let (engine, tracks) = local_tracks();
        engine.delay_acquisitions(vec![Duration::from_millis(10)]);

        let (acquired, ()) = futures::join!(tracks.request(None, None), async {
            time::sleep(Duration::from_millis(5)).await;
            tracks.clear().await;
        });

        assert!(!acquired);
        assert_eq!(tracks.count(), 0);
        assert!(engine.tracks.borrow().iter().all(|t| t.is_disposed()));
    })
    .await;
}
