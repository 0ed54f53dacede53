//! Capture session lifecycle
//!
//! The controller opens the preferred device, attaches the imaging effect to
//! the preview stream and moves it to the record stream while recording.

mod lifecycle;
mod session;

#[cfg(test)]
mod tests;

pub use lifecycle::CaptureController;
pub use session::{ControllerStats, RecordingToggle, SessionSnapshot};
