pub mod keyboard_input;

mod orchestrator;
mod runtime;
mod shutdown;
mod types;


pub use orchestrator::EffectcamApp;
pub use types::{AppCommand, ShutdownReason};
