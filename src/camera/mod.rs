mod device;
mod diagnostics;
mod format;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst_backend;
mod mock;
mod platform;

pub use device::{select_device, DeviceDescriptor, EnclosureLocation, Panel};
pub use diagnostics::{list_device_details, list_format_details, log_format};
pub use format::{
    select_preview_format, select_record_format, Container, EncodingCandidate, EncodingProfile,
    Ratio, StreamKind, VideoQuality,
};
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst_backend::GstPlatform;
pub use mock::{MockPlatform, MockStats, PlatformCall};
pub use platform::{CaptureHandle, CapturePlatform, FocusPreset};
