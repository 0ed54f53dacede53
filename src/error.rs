use thiserror::Error;

#[derive(Error, Debug)]
pub enum EffectcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    #[error("System error: {message}")]
    System { message: String },
}

/// Failures at the platform capture boundary
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No video capture device available")]
    NoDevice,

    #[error("Failed to open device {device_id}: {details}")]
    DeviceOpen { device_id: String, details: String },

    #[error("Device {device_id} is already held by another session")]
    DeviceBusy { device_id: String },

    #[error("No {stream} format matches {requirement}")]
    FormatUnavailable { stream: String, requirement: String },

    #[error("Platform call {operation} failed: {details}")]
    Platform { operation: String, details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },
}

/// Controller state machine violations and recording failures
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No capture session is active")]
    NoActiveSession,

    #[error("A capture session is already active ({session_id})")]
    SessionAlreadyActive { session_id: String },

    #[error("Another capture transition is in progress")]
    TransitionInProgress,

    #[error("Recording failed: {details}")]
    Recording { details: String },

    #[error("Output file {path}: {source}")]
    OutputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum EffectError {
    #[error("Parameter {name} = {value} is outside {min}..={max}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Missing effect property: {key}")]
    MissingProperty { key: String },

    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("Malformed effect property {key}: {details}")]
    Malformed { key: String, details: String },

    #[error("Effect configuration has no filters")]
    Empty,

    #[error("Filter {name} appears more than once")]
    DuplicateFilter { name: String },
}

impl EffectcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

impl CameraError {
    pub fn platform<S: Into<String>>(operation: &str, details: S) -> Self {
        Self::Platform {
            operation: operation.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EffectcamError>;
