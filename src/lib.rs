pub mod app;
pub mod camera;
pub mod config;
pub mod controller;
pub mod effect;
pub mod error;
pub mod events;
pub mod output;

pub use app::{AppCommand, EffectcamApp, ShutdownReason};
pub use camera::{
    CaptureHandle, CapturePlatform, DeviceDescriptor, EncodingCandidate, EncodingProfile,
    MockPlatform, Panel, StreamKind, VideoQuality,
};
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use camera::GstPlatform;
pub use config::EffectcamConfig;
pub use controller::{CaptureController, ControllerStats, RecordingToggle, SessionSnapshot};
pub use effect::{FilterConfig, ImagingEffectConfig, LomoFilter, SolarizeFilter};
pub use error::{CameraError, CaptureError, EffectError, EffectcamError, Result};
pub use events::{CaptureEvent, EventBus};
pub use output::{OutputFile, SaveSuggestion};
