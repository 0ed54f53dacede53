use crate::camera::{Panel, VideoQuality};
use crate::effect::{FilterConfig, ImagingEffectConfig, IMAGING_EFFECT_ID};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EffectcamConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub effect: EffectConfig,
    pub capture: CaptureConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Preview format width that must be advertised by the device
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    /// Enclosure panel preferred when picking a device
    #[serde(default = "default_preferred_panel")]
    pub preferred_panel: Panel,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EffectConfig {
    /// Activatable id of the effect component
    #[serde(default = "default_effect_id")]
    pub effect_id: String,

    /// Filter chain passed to the effect
    #[serde(default = "default_filters")]
    pub filters: Vec<FilterConfig>,
}

impl EffectConfig {
    pub fn imaging(&self) -> ImagingEffectConfig {
        ImagingEffectConfig {
            filters: self.filters.clone(),
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            effect_id: default_effect_id(),
            filters: default_filters(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Directory holding the temporary recording
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Temporary recording file name, overwritten on each recording
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Recording quality preset
    #[serde(default)]
    pub quality: VideoQuality,

    /// Copy finished recordings here; recordings stay in `temp_dir` when unset
    #[serde(default)]
    pub save_dir: Option<String>,
}

impl CaptureConfig {
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.temp_dir).join(&self.file_name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Capacity of the controller event bus
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl EffectcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("effectcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("camera.preview_width", default_preview_width())?
            .set_default("camera.preferred_panel", "Back")?
            .set_default("effect.effect_id", default_effect_id())?
            .set_default("capture.temp_dir", default_temp_dir())?
            .set_default("capture.file_name", default_file_name())?
            .set_default("capture.quality", "Hd720p")?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. EFFECTCAM_CAMERA__PREVIEW_WIDTH=640
            .add_source(
                Environment::with_prefix("EFFECTCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EffectcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.preview_width == 0 {
            return Err(ConfigError::Message(
                "Camera preview_width must be greater than 0".to_string(),
            ));
        }

        if self.effect.effect_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "Effect effect_id must not be empty".to_string(),
            ));
        }

        self.effect
            .imaging()
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid effect configuration: {}", e)))?;

        if self.capture.file_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Capture file_name must not be empty".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for EffectcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                preview_width: default_preview_width(),
                preferred_panel: default_preferred_panel(),
            },
            effect: EffectConfig::default(),
            capture: CaptureConfig {
                temp_dir: default_temp_dir(),
                file_name: default_file_name(),
                quality: VideoQuality::default(),
                save_dir: None,
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_preview_width() -> u32 {
    800
}
fn default_preferred_panel() -> Panel {
    Panel::Back
}

fn default_effect_id() -> String {
    IMAGING_EFFECT_ID.to_string()
}
fn default_filters() -> Vec<FilterConfig> {
    ImagingEffectConfig::default().filters
}

fn default_temp_dir() -> String {
    std::env::temp_dir()
        .join("effectcam")
        .to_string_lossy()
        .into_owned()
}
fn default_file_name() -> String {
    "test.mp4".to_string()
}

fn default_event_bus_capacity() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::SolarizeFilter;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EffectcamConfig::default();

        assert_eq!(config.camera.preview_width, 800);
        assert_eq!(config.camera.preferred_panel, Panel::Back);
        assert_eq!(config.effect.effect_id, "ImagingEffects.ImagingEffect");
        assert_eq!(config.capture.file_name, "test.mp4");
        assert_eq!(config.capture.quality, VideoQuality::Hd720p);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EffectcamConfig::default();
        config.camera.preview_width = 0;
        assert!(config.validate().is_err());

        config.camera.preview_width = 800;
        config.system.event_bus_capacity = 0;
        assert!(config.validate().is_err());

        config.system.event_bus_capacity = 8;
        config.effect.filters.clear();
        assert!(config.validate().is_err());

        config.effect.filters = vec![FilterConfig::Solarize(SolarizeFilter { threshold: 0.3 })];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[camera]
preview_width = 640
preferred_panel = "Front"

[capture]
file_name = "clip.mp4"
quality = "Vga"
save_dir = "/tmp/effectcam-saved"

[system]
event_bus_capacity = 4
"#
        )
        .unwrap();

        let config = EffectcamConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.preview_width, 640);
        assert_eq!(config.camera.preferred_panel, Panel::Front);
        assert_eq!(config.capture.file_name, "clip.mp4");
        assert_eq!(config.capture.quality, VideoQuality::Vga);
        assert_eq!(
            config.capture.save_dir.as_deref(),
            Some("/tmp/effectcam-saved")
        );
        assert_eq!(config.system.event_bus_capacity, 4);
        assert_eq!(config.effect.imaging(), ImagingEffectConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = EffectcamConfig::load_from_file("/nonexistent/effectcam.toml").unwrap();
        assert_eq!(config.camera.preview_width, 800);
        assert_eq!(config.capture.file_name, "test.mp4");
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = EffectcamConfig::default().to_toml().unwrap();
        assert!(rendered.contains("preview_width = 800"));
        assert!(rendered.contains("kind = \"Lomo\""));
    }
}
