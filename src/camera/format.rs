use crate::error::CameraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stream of a capture session a format or effect applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Preview,
    Record,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Preview => f.write_str("preview"),
            StreamKind::Record => f.write_str("record"),
        }
    }
}

/// Exact ratio such as a frame rate of 30000/1001
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    pub num: u32,
    pub denom: u32,
}

impl Ratio {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn from_int(value: u32) -> Self {
        Self { num: value, denom: 1 }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::from_int(1)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

/// One advertised resolution/format of a device stream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodingCandidate {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Ratio,
    pub bitrate: u32,
    pub pixel_aspect_ratio: Ratio,
    pub profile_id: i32,
    pub subtype: String,
    pub media_type: String,
    pub properties: BTreeMap<String, String>,
}

impl EncodingCandidate {
    pub fn video<S: Into<String>>(width: u32, height: u32, fps: u32, subtype: S) -> Self {
        Self {
            width,
            height,
            frame_rate: Ratio::from_int(fps),
            pixel_aspect_ratio: Ratio::from_int(1),
            subtype: subtype.into(),
            media_type: "Video".to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for EncodingCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {:.2}fps {}",
            self.width,
            self.height,
            self.frame_rate.as_f64(),
            self.subtype
        )
    }
}

/// First candidate whose width equals `target_width`
pub fn select_preview_format(
    candidates: &[EncodingCandidate],
    target_width: u32,
) -> Result<&EncodingCandidate, CameraError> {
    candidates
        .iter()
        .find(|c| c.width == target_width)
        .ok_or_else(|| CameraError::FormatUnavailable {
            stream: StreamKind::Preview.to_string(),
            requirement: format!("width {}", target_width),
        })
}

/// First candidate carrying the widest width in the list
pub fn select_record_format(
    candidates: &[EncodingCandidate],
) -> Result<&EncodingCandidate, CameraError> {
    let max_width = candidates
        .iter()
        .map(|c| c.width)
        .max()
        .ok_or_else(|| CameraError::FormatUnavailable {
            stream: StreamKind::Record.to_string(),
            requirement: "any format".to_string(),
        })?;

    candidates
        .iter()
        .find(|c| c.width == max_width)
        .ok_or_else(|| CameraError::FormatUnavailable {
            stream: StreamKind::Record.to_string(),
            requirement: format!("width {}", max_width),
        })
}

/// Video quality preset for the recording profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoQuality {
    Auto,
    Hd1080p,
    #[default]
    Hd720p,
    Wvga,
    Ntsc,
    Pal,
    Vga,
    Qvga,
}

impl VideoQuality {
    /// Nominal output dimensions, `None` lets the platform decide
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            VideoQuality::Auto => None,
            VideoQuality::Hd1080p => Some((1920, 1080)),
            VideoQuality::Hd720p => Some((1280, 720)),
            VideoQuality::Wvga => Some((800, 480)),
            VideoQuality::Ntsc => Some((720, 480)),
            VideoQuality::Pal => Some((720, 576)),
            VideoQuality::Vga => Some((640, 480)),
            VideoQuality::Qvga => Some((320, 240)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
        }
    }
}

/// Container and quality used when recording to file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    pub container: Container,
    pub quality: VideoQuality,
}

impl EncodingProfile {
    pub fn mp4(quality: VideoQuality) -> Self {
        Self {
            container: Container::Mp4,
            quality,
        }
    }
}

impl fmt::Display for EncodingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.container, self.quality)
    }
}
