use crate::error::CameraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Physical panel a camera is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Panel {
    #[default]
    Unknown,
    Front,
    Back,
    Top,
    Bottom,
    Left,
    Right,
}

impl Panel {
    /// Parse the location strings reported by device monitors ("front", "back", "external")
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "front" => Panel::Front,
            "back" | "rear" => Panel::Back,
            "top" => Panel::Top,
            "bottom" => Panel::Bottom,
            "left" => Panel::Left,
            "right" => Panel::Right,
            _ => Panel::Unknown,
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Panel::Unknown => "Unknown",
            Panel::Front => "Front",
            Panel::Back => "Back",
            Panel::Top => "Top",
            Panel::Bottom => "Bottom",
            Panel::Left => "Left",
            Panel::Right => "Right",
        };
        f.write_str(name)
    }
}

/// Where a device sits in the enclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnclosureLocation {
    pub in_dock: bool,
    pub in_lid: bool,
    pub panel: Panel,
}

/// Read-only description of an enumerated video capture device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub enclosure: Option<EnclosureLocation>,
    pub is_enabled: bool,
    pub is_default: bool,
    pub properties: BTreeMap<String, String>,
}

impl DeviceDescriptor {
    pub fn new<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enclosure: None,
            is_enabled: true,
            is_default: false,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.enclosure = Some(EnclosureLocation {
            panel,
            ..EnclosureLocation::default()
        });
        self
    }

    pub fn panel(&self) -> Option<Panel> {
        self.enclosure.map(|e| e.panel)
    }
}

/// Pick the first device mounted on `preferred`, falling back to the first device
pub fn select_device(
    devices: &[DeviceDescriptor],
    preferred: Panel,
) -> Result<&DeviceDescriptor, CameraError> {
    devices
        .iter()
        .find(|d| d.panel() == Some(preferred))
        .or_else(|| devices.first())
        .ok_or(CameraError::NoDevice)
}
