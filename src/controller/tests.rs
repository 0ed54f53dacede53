use super::*;
use crate::camera::{
    CapturePlatform, DeviceDescriptor, EncodingCandidate, FocusPreset, MockPlatform, PlatformCall,
    StreamKind,
};
use crate::config::EffectcamConfig;
use crate::effect::{ImagingEffectConfig, IMAGING_EFFECT_ID};
use crate::error::{CameraError, CaptureError, EffectcamError};
use crate::events::CaptureEvent;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(temp: &TempDir) -> EffectcamConfig {
    let mut config = EffectcamConfig::default();
    config.capture.temp_dir = temp.path().join("tmp").to_string_lossy().into_owned();
    config
}

fn controller_with(platform: &MockPlatform, config: EffectcamConfig) -> CaptureController {
    let platform: Arc<dyn CapturePlatform> = Arc::new(platform.clone());
    CaptureController::new(platform, config).unwrap()
}

#[tokio::test]
async fn test_initialize_starts_preview_on_back_device() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    controller.initialize().await.unwrap();

    let session = controller.session().await.unwrap();
    assert_eq!(session.device_id, "mock-back");
    assert_eq!(session.preview_format.width, 800);
    assert_eq!(session.record_format.width, 1920);
    assert_eq!(session.effect_stream, Some(StreamKind::Preview));
    assert!(session.is_previewing);
    assert!(!session.is_recording);

    let stats = platform.stats();
    assert_eq!(stats.live_device.as_deref(), Some("mock-back"));
    assert_eq!(stats.preview_effects, vec![IMAGING_EFFECT_ID.to_string()]);
    assert!(stats.record_effects.is_empty());
    assert!(stats.previewing);
    assert_eq!(stats.count(&PlatformCall::SetFormat(StreamKind::Preview, 800, 448)), 1);
    assert_eq!(stats.count(&PlatformCall::SetFormat(StreamKind::Record, 1920, 1080)), 1);
    assert_eq!(
        stats.count(&PlatformCall::SetFocusPreset(FocusPreset::Manual)),
        1
    );

    assert_eq!(
        platform.effect_properties(StreamKind::Preview),
        Some(ImagingEffectConfig::default().to_property_set())
    );
    assert!(controller.output_path().unwrap().exists());
    assert_eq!(controller.devices().len(), 2);
}

#[tokio::test]
async fn test_initialize_without_devices_fails() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::new(vec![], vec![], vec![]);
    let controller = controller_with(&platform, test_config(&temp));

    let result = controller.initialize().await;
    assert!(matches!(
        result,
        Err(EffectcamError::Camera(CameraError::NoDevice))
    ));
    assert!(controller.session().await.is_none());
}

#[tokio::test]
async fn test_missing_preview_width_releases_handle() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::new(
        vec![DeviceDescriptor::new("usb-0", "USB Camera")],
        vec![EncodingCandidate::video(640, 480, 30, "YUY2")],
        vec![EncodingCandidate::video(640, 480, 30, "YUY2")],
    );
    let controller = controller_with(&platform, test_config(&temp));

    let result = controller.start_session().await;
    assert!(matches!(
        result,
        Err(EffectcamError::Camera(CameraError::FormatUnavailable { .. }))
    ));

    let stats = platform.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.disposed, 1);
    assert!(stats.live_device.is_none());
    assert!(controller.session().await.is_none());
    assert_eq!(controller.stats().sessions_started, 0);
}

#[tokio::test]
async fn test_toggle_moves_effect_between_streams() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    controller.initialize().await.unwrap();

    let started = controller.toggle_recording().await.unwrap();
    let path = match started {
        RecordingToggle::Started { path } => path,
        other => panic!("unexpected toggle result: {:?}", other),
    };
    assert!(controller.is_recording().await);
    let stats = platform.stats();
    assert!(stats.preview_effects.is_empty());
    assert_eq!(stats.record_effects, vec![IMAGING_EFFECT_ID.to_string()]);
    assert_eq!(stats.recording.as_deref(), Some(path.as_path()));
    assert_eq!(
        controller.session().await.unwrap().effect_stream,
        Some(StreamKind::Record)
    );

    let stopped = controller.toggle_recording().await.unwrap();
    assert_eq!(
        stopped,
        RecordingToggle::Stopped {
            path: path.clone(),
            saved_to: None
        }
    );
    assert!(!controller.is_recording().await);
    assert!(controller.is_previewing().await);
    let stats = platform.stats();
    assert_eq!(stats.preview_effects, vec![IMAGING_EFFECT_ID.to_string()]);
    assert!(stats.record_effects.is_empty());
    assert!(stats.recording.is_none());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("mock recording"));
    assert_eq!(controller.stats().recordings_completed, 1);
}

#[tokio::test]
async fn test_toggle_with_save_dir_persists_recording() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    let videos = temp.path().join("videos");
    config.capture.save_dir = Some(videos.to_string_lossy().into_owned());

    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, config);
    controller.initialize().await.unwrap();

    controller.toggle_recording().await.unwrap();
    let saved_to = match controller.toggle_recording().await.unwrap() {
        RecordingToggle::Stopped { saved_to, .. } => saved_to.unwrap(),
        other => panic!("unexpected toggle result: {:?}", other),
    };

    assert!(saved_to.starts_with(&videos));
    assert!(saved_to.to_string_lossy().ends_with("test.mp4"));
    assert!(std::fs::read_to_string(&saved_to)
        .unwrap()
        .starts_with("mock recording"));
}

#[tokio::test]
async fn test_failed_record_start_restores_preview_effect() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    controller.initialize().await.unwrap();

    // the mock cannot write the recording once its directory is gone
    std::fs::remove_dir_all(temp.path().join("tmp")).unwrap();
    assert!(controller.toggle_recording().await.is_err());

    let session = controller.session().await.unwrap();
    assert!(!session.is_recording);
    assert_eq!(session.effect_stream, Some(StreamKind::Preview));
    let stats = platform.stats();
    assert_eq!(stats.preview_effects, vec![IMAGING_EFFECT_ID.to_string()]);
    assert!(stats.record_effects.is_empty());
    assert!(stats.recording.is_none());

    std::fs::create_dir_all(temp.path().join("tmp")).unwrap();
    controller.toggle_recording().await.unwrap();
    let stats = platform.stats();
    assert_eq!(stats.record_effects, vec![IMAGING_EFFECT_ID.to_string()]);
    assert!(stats.preview_effects.is_empty());
    assert!(controller.is_recording().await);
}

#[tokio::test]
async fn test_unwritable_save_dir_still_stops_recording() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let mut config = test_config(&temp);
    config.capture.save_dir = Some(blocker.join("videos").to_string_lossy().into_owned());

    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, config);
    controller.initialize().await.unwrap();
    controller.toggle_recording().await.unwrap();

    let mut events = controller.event_bus().subscribe();
    let stopped = controller.toggle_recording().await.unwrap();
    assert!(matches!(
        stopped,
        RecordingToggle::Stopped { saved_to: None, .. }
    ));
    assert!(!controller.is_recording().await);
    assert_eq!(controller.stats().recordings_completed, 1);

    let fault = events.recv().await.unwrap();
    assert!(matches!(
        fault,
        CaptureEvent::Fault { ref operation, .. } if operation == "save_recording"
    ));
    let recorded = events.recv().await.unwrap();
    assert!(matches!(
        recorded,
        CaptureEvent::RecordingStopped { saved_to: None, .. }
    ));
}

#[tokio::test]
async fn test_toggle_after_hide_reports_no_session() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    controller.initialize().await.unwrap();
    controller.on_visibility_changed(false).await.unwrap();

    let result = controller.toggle_recording().await;
    assert!(matches!(
        result,
        Err(EffectcamError::Capture(CaptureError::NoActiveSession))
    ));
    assert!(!platform
        .stats()
        .calls
        .iter()
        .any(|call| matches!(call, PlatformCall::StartRecord(_))));
}

#[tokio::test]
async fn test_toggle_without_session_fails() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    let result = controller.toggle_recording().await;
    assert!(matches!(
        result,
        Err(EffectcamError::Capture(CaptureError::NoActiveSession))
    ));
    assert!(platform.stats().calls.is_empty());
}

#[tokio::test]
async fn test_stop_then_start_never_double_opens() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    controller.initialize().await.unwrap();
    controller.stop_session().await.unwrap();
    controller.start_session().await.unwrap();

    let stats = platform.stats();
    assert_eq!(stats.opened, 2);
    assert_eq!(stats.disposed, 1);
    assert_eq!(stats.count(&PlatformCall::Open("mock-back".to_string())), 2);
    assert!(controller.is_previewing().await);
}

#[tokio::test]
async fn test_start_while_active_is_rejected() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    controller.initialize().await.unwrap();

    let result = controller.start_session().await;
    assert!(matches!(
        result,
        Err(EffectcamError::Capture(CaptureError::SessionAlreadyActive { .. }))
    ));
    assert_eq!(platform.stats().opened, 1);
}

#[tokio::test]
async fn test_stop_while_recording_finalizes_output() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    controller.initialize().await.unwrap();
    controller.toggle_recording().await.unwrap();

    controller.stop_session().await.unwrap();

    let stats = platform.stats();
    assert_eq!(stats.count(&PlatformCall::StopRecord), 1);
    assert_eq!(stats.count(&PlatformCall::StopPreview), 1);
    assert_eq!(stats.disposed, 1);
    assert!(stats.live_device.is_none());
    assert_eq!(controller.stats().recordings_completed, 1);
    assert_eq!(controller.stats().sessions_stopped, 1);
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    controller.stop_session().await.unwrap();
    assert!(platform.stats().calls.is_empty());
    assert_eq!(controller.stats().sessions_stopped, 0);
}

#[tokio::test]
async fn test_visibility_sequence_starts_and_stops() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    for visible in [true, false, true] {
        controller.on_visibility_changed(visible).await.unwrap();
    }

    let stats = controller.stats();
    assert_eq!(stats.sessions_started, 2);
    assert_eq!(stats.sessions_stopped, 1);
    assert!(controller.is_previewing().await);
}

#[tokio::test]
async fn test_duplicate_visibility_events_are_collapsed() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));

    for visible in [true, true, false, false, true] {
        controller.on_visibility_changed(visible).await.unwrap();
    }

    let stats = controller.stats();
    assert_eq!(stats.sessions_started, 2);
    assert_eq!(stats.sessions_stopped, 1);
    assert_eq!(platform.stats().opened, 2);
}

#[tokio::test]
async fn test_unsupported_focus_disables_autofocus() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone().with_focus_supported(false);
    let controller = controller_with(&platform, test_config(&temp));

    controller.initialize().await.unwrap();

    let stats = platform.stats();
    assert_eq!(stats.count(&PlatformCall::SetAutofocus(false)), 1);
    assert_eq!(
        stats.count(&PlatformCall::SetFocusPreset(FocusPreset::Manual)),
        0
    );
}

#[tokio::test]
async fn test_toggle_rejected_during_transition() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone().with_call_delay(Duration::from_millis(20));
    let controller = controller_with(&platform, test_config(&temp));

    let (started, toggled) = tokio::join!(controller.start_session(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.toggle_recording().await
    });

    started.unwrap();
    assert!(matches!(
        toggled,
        Err(EffectcamError::Capture(CaptureError::TransitionInProgress))
    ));
    assert!(!controller.is_recording().await);
}

#[tokio::test]
async fn test_overlapping_visibility_changes_are_serialized() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone().with_call_delay(Duration::from_millis(5));
    let controller = controller_with(&platform, test_config(&temp));

    let (shown, hidden) = tokio::join!(
        controller.on_visibility_changed(true),
        controller.on_visibility_changed(false)
    );
    shown.unwrap();
    hidden.unwrap();

    let stats = platform.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.disposed, 1);
    assert!(stats.live_device.is_none());
    assert!(controller.session().await.is_none());
}

#[tokio::test]
async fn test_lifecycle_events_are_published() {
    let temp = TempDir::new().unwrap();
    let platform = MockPlatform::phone();
    let controller = controller_with(&platform, test_config(&temp));
    let mut events = controller.event_bus().subscribe();

    controller.initialize().await.unwrap();
    controller.stop_session().await.unwrap();

    let started = events.recv().await.unwrap();
    assert!(matches!(
        started,
        CaptureEvent::SessionStarted { ref device_id, .. } if device_id == "mock-back"
    ));
    let stopped = events.recv().await.unwrap();
    assert_eq!(stopped.event_type(), "session_stopped");
}
