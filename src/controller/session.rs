use crate::camera::{CaptureHandle, DeviceDescriptor, EncodingCandidate, StreamKind};
use uuid::Uuid;

/// Live binding between the controller and one opened device
pub(super) struct CaptureSession {
    pub(super) id: String,
    pub(super) handle: Box<dyn CaptureHandle>,
    pub(super) device: DeviceDescriptor,
    pub(super) preview_format: EncodingCandidate,
    pub(super) record_format: EncodingCandidate,
    pub(super) effect_stream: Option<StreamKind>,
    pub(super) is_previewing: bool,
    pub(super) is_recording: bool,
}

impl CaptureSession {
    pub(super) fn new(
        handle: Box<dyn CaptureHandle>,
        device: DeviceDescriptor,
        preview_format: EncodingCandidate,
        record_format: EncodingCandidate,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            handle,
            device,
            preview_format,
            record_format,
            effect_stream: Some(StreamKind::Preview),
            is_previewing: true,
            is_recording: false,
        }
    }

    pub(super) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            device_id: self.device.id.clone(),
            device_name: self.device.name.clone(),
            preview_format: self.preview_format.clone(),
            record_format: self.record_format.clone(),
            effect_stream: self.effect_stream,
            is_previewing: self.is_previewing,
            is_recording: self.is_recording,
        }
    }
}

/// Read-only view of the active session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub preview_format: EncodingCandidate,
    pub record_format: EncodingCandidate,
    /// Stream the effect is currently attached to
    pub effect_stream: Option<StreamKind>,
    pub is_previewing: bool,
    pub is_recording: bool,
}

/// Session counters since the controller was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerStats {
    pub sessions_started: u64,
    pub sessions_stopped: u64,
    pub recordings_completed: u64,
}

/// Result of a recording toggle
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingToggle {
    Started {
        path: std::path::PathBuf,
    },
    Stopped {
        path: std::path::PathBuf,
        saved_to: Option<std::path::PathBuf>,
    },
}
