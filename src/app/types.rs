/// Command delivered to the application loop
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Start or stop recording
    ToggleRecording,
    /// Flip the simulated host visibility
    ToggleVisibility,
    /// Leave the application loop
    Shutdown(ShutdownReason),
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
}
