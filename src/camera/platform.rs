use super::device::DeviceDescriptor;
use super::format::{EncodingCandidate, EncodingProfile, StreamKind};
use crate::effect::PropertySet;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Focus preset requested from the device focus control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPreset {
    Auto,
    Manual,
    AutoMacro,
    AutoNormal,
    AutoInfinity,
}

/// Entry point into the platform capture framework
///
/// A platform enumerates devices and opens capture handles. It never holds
/// session state of its own; the returned handle owns the device until
/// [`CaptureHandle::dispose`] is called.
#[async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Enumerate video capture devices
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Initialize a capture object bound to the device with `device_id`
    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureHandle>>;
}

/// An initialized platform capture object
///
/// Every async method is a suspension point into the platform. Calls are
/// issued one at a time by the controller, never concurrently.
#[async_trait]
pub trait CaptureHandle: Send {
    /// Formats the device advertises for `stream`
    fn available_formats(&self, stream: StreamKind) -> Vec<EncodingCandidate>;

    async fn set_format(&mut self, stream: StreamKind, format: &EncodingCandidate) -> Result<()>;

    /// Attach the effect identified by `effect_id` to `stream`
    async fn add_effect(
        &mut self,
        stream: StreamKind,
        effect_id: &str,
        properties: &PropertySet,
    ) -> Result<()>;

    /// Remove every effect attached to `stream`
    async fn clear_effects(&mut self, stream: StreamKind) -> Result<()>;

    async fn start_preview(&mut self) -> Result<()>;

    async fn stop_preview(&mut self) -> Result<()>;

    /// Start encoding the record stream into `path`, overwriting it
    async fn start_record(&mut self, profile: &EncodingProfile, path: &Path) -> Result<()>;

    /// Stop encoding and finalize the output file
    async fn stop_record(&mut self) -> Result<()>;

    fn focus_supported(&self) -> bool;

    async fn set_focus_preset(&mut self, preset: FocusPreset) -> Result<()>;

    /// Best-effort autofocus toggle, returns whether the device accepted it
    fn try_set_autofocus(&mut self, enabled: bool) -> bool;

    /// Release the device
    async fn dispose(self: Box<Self>) -> Result<()>;
}
