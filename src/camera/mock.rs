use super::device::{DeviceDescriptor, Panel};
use super::format::{EncodingCandidate, EncodingProfile, StreamKind};
use super::platform::{CaptureHandle, CapturePlatform, FocusPreset};
use crate::effect::PropertySet;
use crate::error::{CameraError, CaptureError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Platform call observed by the mock, in issue order
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Enumerate,
    Open(String),
    SetFormat(StreamKind, u32, u32),
    AddEffect(StreamKind, String),
    ClearEffects(StreamKind),
    StartPreview,
    StopPreview,
    StartRecord(PathBuf),
    StopRecord,
    SetFocusPreset(FocusPreset),
    SetAutofocus(bool),
    Dispose,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<PlatformCall>,
    opened: u32,
    disposed: u32,
    live_device: Option<String>,
    effects: HashMap<StreamKind, Vec<(String, PropertySet)>>,
    previewing: bool,
    recording: Option<PathBuf>,
}

/// Snapshot of the mock platform state
#[derive(Debug, Clone)]
pub struct MockStats {
    pub calls: Vec<PlatformCall>,
    pub opened: u32,
    pub disposed: u32,
    pub live_device: Option<String>,
    pub preview_effects: Vec<String>,
    pub record_effects: Vec<String>,
    pub previewing: bool,
    pub recording: Option<PathBuf>,
}

impl MockStats {
    pub fn count(&self, call: &PlatformCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

/// In-memory capture platform for tests and hardware-less runs
///
/// Faults with [`CameraError::DeviceBusy`] when a device is opened while a
/// previous handle has not been disposed.
#[derive(Clone)]
pub struct MockPlatform {
    devices: Vec<DeviceDescriptor>,
    preview_formats: Vec<EncodingCandidate>,
    record_formats: Vec<EncodingCandidate>,
    focus_supported: bool,
    call_delay: Duration,
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new(
        devices: Vec<DeviceDescriptor>,
        preview_formats: Vec<EncodingCandidate>,
        record_formats: Vec<EncodingCandidate>,
    ) -> Self {
        Self {
            devices,
            preview_formats,
            record_formats,
            focus_supported: true,
            call_delay: Duration::ZERO,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// A phone-like device pair with the usual preview and record format lists
    pub fn phone() -> Self {
        let front = DeviceDescriptor::new("mock-front", "Mock Front Camera").with_panel(Panel::Front);
        let mut back = DeviceDescriptor::new("mock-back", "Mock Back Camera").with_panel(Panel::Back);
        back.is_default = true;

        let preview = vec![
            EncodingCandidate::video(640, 480, 30, "NV12"),
            EncodingCandidate::video(800, 448, 30, "NV12"),
            EncodingCandidate::video(1280, 720, 30, "NV12"),
        ];
        let record = vec![
            EncodingCandidate::video(640, 480, 30, "NV12"),
            EncodingCandidate::video(1920, 1080, 30, "NV12"),
            EncodingCandidate::video(1280, 720, 30, "NV12"),
        ];

        Self::new(vec![front, back], preview, record)
    }

    pub fn with_focus_supported(mut self, supported: bool) -> Self {
        self.focus_supported = supported;
        self
    }

    /// Delay every async platform call, used to widen race windows
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn stats(&self) -> MockStats {
        let state = self.state.lock();
        let names = |stream: StreamKind| -> Vec<String> {
            state
                .effects
                .get(&stream)
                .map(|effects| effects.iter().map(|(id, _)| id.clone()).collect())
                .unwrap_or_default()
        };
        MockStats {
            calls: state.calls.clone(),
            opened: state.opened,
            disposed: state.disposed,
            live_device: state.live_device.clone(),
            preview_effects: names(StreamKind::Preview),
            record_effects: names(StreamKind::Record),
            previewing: state.previewing,
            recording: state.recording.clone(),
        }
    }

    /// Property set last attached to `stream` on the live handle
    pub fn effect_properties(&self, stream: StreamKind) -> Option<PropertySet> {
        self.state
            .lock()
            .effects
            .get(&stream)
            .and_then(|effects| effects.last())
            .map(|(_, properties)| properties.clone())
    }

    async fn pause(&self) {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }
}

#[async_trait]
impl CapturePlatform for MockPlatform {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        self.pause().await;
        self.state.lock().calls.push(PlatformCall::Enumerate);
        Ok(self.devices.clone())
    }

    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureHandle>> {
        self.pause().await;

        if !self.devices.iter().any(|d| d.id == device_id) {
            return Err(CameraError::DeviceOpen {
                device_id: device_id.to_string(),
                details: "unknown device".to_string(),
            }
            .into());
        }

        let mut state = self.state.lock();
        state.calls.push(PlatformCall::Open(device_id.to_string()));
        if let Some(live) = &state.live_device {
            return Err(CameraError::DeviceBusy {
                device_id: live.clone(),
            }
            .into());
        }

        state.opened += 1;
        state.live_device = Some(device_id.to_string());
        state.effects.clear();
        debug!("Mock platform opened {}", device_id);

        Ok(Box::new(MockHandle {
            platform: self.clone(),
            recording_path: None,
        }))
    }
}

struct MockHandle {
    platform: MockPlatform,
    recording_path: Option<PathBuf>,
}

impl MockHandle {
    fn record(&self, call: PlatformCall) {
        trace!("Mock platform call: {:?}", call);
        self.platform.state.lock().calls.push(call);
    }
}

#[async_trait]
impl CaptureHandle for MockHandle {
    fn available_formats(&self, stream: StreamKind) -> Vec<EncodingCandidate> {
        match stream {
            StreamKind::Preview => self.platform.preview_formats.clone(),
            StreamKind::Record => self.platform.record_formats.clone(),
        }
    }

    async fn set_format(&mut self, stream: StreamKind, format: &EncodingCandidate) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::SetFormat(stream, format.width, format.height));
        Ok(())
    }

    async fn add_effect(
        &mut self,
        stream: StreamKind,
        effect_id: &str,
        properties: &PropertySet,
    ) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::AddEffect(stream, effect_id.to_string()));
        self.platform
            .state
            .lock()
            .effects
            .entry(stream)
            .or_default()
            .push((effect_id.to_string(), properties.clone()));
        Ok(())
    }

    async fn clear_effects(&mut self, stream: StreamKind) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::ClearEffects(stream));
        self.platform.state.lock().effects.remove(&stream);
        Ok(())
    }

    async fn start_preview(&mut self) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::StartPreview);
        self.platform.state.lock().previewing = true;
        Ok(())
    }

    async fn stop_preview(&mut self) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::StopPreview);
        self.platform.state.lock().previewing = false;
        Ok(())
    }

    async fn start_record(&mut self, profile: &EncodingProfile, path: &Path) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::StartRecord(path.to_path_buf()));
        tokio::fs::write(path, format!("mock recording {}\n", profile)).await?;
        self.recording_path = Some(path.to_path_buf());
        self.platform.state.lock().recording = Some(path.to_path_buf());
        Ok(())
    }

    async fn stop_record(&mut self) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::StopRecord);
        if self.recording_path.take().is_none() {
            return Err(CaptureError::Recording {
                details: "no recording in progress".to_string(),
            }
            .into());
        }
        self.platform.state.lock().recording = None;
        Ok(())
    }

    fn focus_supported(&self) -> bool {
        self.platform.focus_supported
    }

    async fn set_focus_preset(&mut self, preset: FocusPreset) -> Result<()> {
        self.platform.pause().await;
        if !self.platform.focus_supported {
            return Err(CameraError::platform("set_focus_preset", "focus control unsupported").into());
        }
        self.record(PlatformCall::SetFocusPreset(preset));
        Ok(())
    }

    fn try_set_autofocus(&mut self, enabled: bool) -> bool {
        self.record(PlatformCall::SetAutofocus(enabled));
        true
    }

    async fn dispose(self: Box<Self>) -> Result<()> {
        self.platform.pause().await;
        self.record(PlatformCall::Dispose);
        let mut state = self.platform.state.lock();
        state.disposed += 1;
        state.live_device = None;
        state.effects.clear();
        state.previewing = false;
        state.recording = None;
        Ok(())
    }
}
