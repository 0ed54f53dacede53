//! GStreamer capture backend.
//!
//! Devices come from a `DeviceMonitor` filtered on `Video/Source`; their caps
//! become the advertised format lists. A session is a pipeline of the shape
//!
//! ```text
//! v4l2src ! caps ! decodebin ! videoconvert ! tee
//!     tee. ! queue ! videobalance(preview_effect) ! videoconvert ! autovideosink
//!     tee. ! queue ! videobalance(record_effect) ! x264enc ! mp4mux ! filesink   (while recording)
//! ```
//!
//! The record branch is added by rebuilding the pipeline; stopping a recording
//! sends EOS so the MP4 is finalized before the preview-only pipeline resumes.

use super::device::{DeviceDescriptor, EnclosureLocation, Panel};
use super::format::{EncodingCandidate, EncodingProfile, Ratio, StreamKind};
use super::platform::{CaptureHandle, CapturePlatform, FocusPreset};
use crate::effect::{FilterConfig, ImagingEffectConfig, PropertySet, IMAGING_EFFECT_ID};
use crate::error::{CameraError, CaptureError, EffectcamError, Result};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const EOS_TIMEOUT_SECONDS: u64 = 5;

/// Capture platform backed by the GStreamer device monitor
pub struct GstPlatform {
    caps_by_device: Arc<Mutex<HashMap<String, gstreamer::Caps>>>,
}

impl GstPlatform {
    pub fn new() -> Result<Self> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self {
            caps_by_device: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Describe a monitored device, `None` when it has no V4L2 node
    fn describe(device: &gstreamer::Device) -> Option<DeviceDescriptor> {
        let name = device.display_name().to_string();
        let mut properties = std::collections::BTreeMap::new();
        let mut id = None;
        let mut panel = None;

        if let Some(props) = device.properties() {
            for (key, value) in props.iter() {
                if let Ok(text) = value.serialize() {
                    properties.insert(key.to_string(), text.to_string());
                }
            }
            id = v4l2_device_path(
                ["api.v4l2.path", "device.path"]
                    .iter()
                    .filter_map(|key| props.get::<String>(*key).ok()),
            );
            panel = ["api.libcamera.location", "camera.location"]
                .iter()
                .find_map(|key| props.get::<String>(*key).ok())
                .map(|location| Panel::from_location(&location));
        }

        let id = id?;
        Some(DeviceDescriptor {
            id,
            name,
            enclosure: panel.map(|panel| EnclosureLocation {
                panel,
                ..EnclosureLocation::default()
            }),
            is_enabled: true,
            is_default: false,
            properties,
        })
    }
}

/// First candidate that names a V4L2 device node usable by `v4l2src`
fn v4l2_device_path<I: IntoIterator<Item = String>>(candidates: I) -> Option<String> {
    candidates
        .into_iter()
        .find(|path| path.starts_with("/dev/video"))
}

#[async_trait]
impl CapturePlatform for GstPlatform {
    fn name(&self) -> &'static str {
        "gstreamer"
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let monitor = gstreamer::DeviceMonitor::new();
        let _ = monitor.add_filter(Some("Video/Source"), None);
        monitor
            .start()
            .map_err(|e| CameraError::platform("enumerate_devices", e.to_string()))?;
        let devices: Vec<gstreamer::Device> = monitor.devices().into_iter().collect();
        monitor.stop();

        let mut caps_by_device = self.caps_by_device.lock();
        let mut descriptors = Vec::with_capacity(devices.len());
        for device in &devices {
            let Some(mut descriptor) = Self::describe(device) else {
                debug!("Skipping {}: no V4L2 device node", device.display_name());
                continue;
            };
            descriptor.is_default = descriptors.is_empty();
            if let Some(caps) = device.caps() {
                caps_by_device.insert(descriptor.id.clone(), caps);
            }
            descriptors.push(descriptor);
        }

        info!("GStreamer device monitor found {} video sources", descriptors.len());
        Ok(descriptors)
    }

    async fn open(&self, device_id: &str) -> Result<Box<dyn CaptureHandle>> {
        let caps = self
            .caps_by_device
            .lock()
            .get(device_id)
            .cloned()
            .ok_or_else(|| CameraError::DeviceOpen {
                device_id: device_id.to_string(),
                details: "device was not enumerated".to_string(),
            })?;

        let formats = formats_from_caps(&caps);
        info!(
            "Opening GStreamer source {} ({} formats advertised)",
            device_id,
            formats.len()
        );

        Ok(Box::new(GstCaptureHandle {
            device_path: device_id.to_string(),
            formats,
            preview_format: None,
            record_format: None,
            effects: HashMap::new(),
            recording: None,
            previewing: false,
            pipeline: None,
        }))
    }
}

/// Convert device caps into encoding candidates, skipping ranged entries
fn formats_from_caps(caps: &gstreamer::Caps) -> Vec<EncodingCandidate> {
    caps.iter()
        .filter_map(|s| {
            let width = s.get::<i32>("width").ok()?;
            let height = s.get::<i32>("height").ok()?;
            let frame_rate = s
                .get::<gstreamer::Fraction>("framerate")
                .map(|f| Ratio::new(f.numer() as u32, f.denom() as u32))
                .unwrap_or_else(|_| Ratio::from_int(30));
            let media_type = s.name().to_string();
            let subtype = s
                .get::<String>("format")
                .unwrap_or_else(|_| media_type.rsplit('/').next().unwrap_or("raw").to_uppercase());

            Some(EncodingCandidate {
                width: width as u32,
                height: height as u32,
                frame_rate,
                pixel_aspect_ratio: Ratio::from_int(1),
                subtype,
                media_type,
                ..EncodingCandidate::default()
            })
        })
        .collect()
}

struct GstCaptureHandle {
    device_path: String,
    formats: Vec<EncodingCandidate>,
    preview_format: Option<EncodingCandidate>,
    record_format: Option<EncodingCandidate>,
    effects: HashMap<StreamKind, ImagingEffectConfig>,
    recording: Option<(PathBuf, EncodingProfile)>,
    previewing: bool,
    pipeline: Option<Pipeline>,
}

impl GstCaptureHandle {
    fn build_pipeline_string(&self) -> String {
        let source_caps = self
            .preview_format
            .as_ref()
            .map(|f| {
                format!(
                    " ! {},width={},height={},framerate={}",
                    f.media_type, f.width, f.height, f.frame_rate
                )
            })
            .unwrap_or_default();

        let mut desc = format!(
            "v4l2src name=source device=\"{}\"{} ! decodebin ! videoconvert ! tee name=t \
             t. ! queue leaky=downstream ! videobalance name=preview_effect ! videoconvert ! autovideosink sync=false",
            self.device_path, source_caps
        );

        if let Some((path, profile)) = &self.recording {
            let scale = profile
                .quality
                .dimensions()
                .or_else(|| self.record_format.as_ref().map(|f| (f.width, f.height)))
                .map(|(w, h)| format!(" ! videoscale ! video/x-raw,width={},height={}", w, h))
                .unwrap_or_default();
            desc.push_str(&format!(
                " t. ! queue ! videobalance name=record_effect ! videoconvert{} ! x264enc tune=zerolatency ! mp4mux ! filesink location=\"{}\"",
                scale,
                path.display()
            ));
        }

        desc
    }

    fn rebuild(&mut self) -> Result<()> {
        self.teardown();

        let desc = self.build_pipeline_string();
        debug!("Creating GStreamer pipeline: {}", desc);

        let pipeline = gstreamer::parse::launch(&desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        for (stream, element) in [
            (StreamKind::Preview, "preview_effect"),
            (StreamKind::Record, "record_effect"),
        ] {
            if let Some(balance) = pipeline.by_name(element) {
                apply_balance(&balance, self.effects.get(&stream));
            }
        }

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::platform("set_state", e.to_string()))?;

        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop GStreamer pipeline: {}", e);
            }
        }
    }

    /// Push the current effect settings into a running pipeline
    fn refresh_effect(&self, stream: StreamKind) {
        let element = match stream {
            StreamKind::Preview => "preview_effect",
            StreamKind::Record => "record_effect",
        };
        if let Some(balance) = self.pipeline.as_ref().and_then(|p| p.by_name(element)) {
            apply_balance(&balance, self.effects.get(&stream));
        }
    }

    async fn finish_recording(&mut self) -> Result<()> {
        let Some(pipeline) = self.pipeline.clone() else {
            return Ok(());
        };

        if !pipeline.send_event(gstreamer::event::Eos::new()) {
            warn!("Pipeline did not accept EOS");
        }
        if let Some(bus) = pipeline.bus() {
            let message = tokio::task::spawn_blocking(move || {
                bus.timed_pop_filtered(
                    gstreamer::ClockTime::from_seconds(EOS_TIMEOUT_SECONDS),
                    &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
                )
            })
            .await
            .map_err(|e| EffectcamError::system(format!("EOS wait task failed: {}", e)))?;

            match message.as_ref().map(|m| m.view()) {
                Some(gstreamer::MessageView::Eos(..)) => debug!("Recording finalized"),
                Some(gstreamer::MessageView::Error(err)) => {
                    return Err(CameraError::platform("stop_record", err.error().to_string()).into())
                }
                _ => warn!(
                    "Recording did not reach EOS within {}s",
                    EOS_TIMEOUT_SECONDS
                ),
            }
        }
        Ok(())
    }
}

/// Approximate the imaging filters with `videobalance` properties
fn apply_balance(balance: &gstreamer::Element, effect: Option<&ImagingEffectConfig>) {
    let (mut brightness, mut contrast, mut saturation) = (0.0f64, 1.0f64, 1.0f64);

    for filter in effect.map(|e| e.filters.as_slice()).unwrap_or_default() {
        match filter {
            FilterConfig::Lomo(lomo) => {
                brightness += (lomo.brightness - 0.5) * 0.5;
                saturation *= lomo.saturation * 2.0;
                contrast *= 1.2;
            }
            FilterConfig::Solarize(solarize) => {
                contrast *= 1.0 + solarize.threshold;
            }
        }
    }

    balance.set_property("brightness", brightness.clamp(-1.0, 1.0));
    balance.set_property("contrast", contrast.clamp(0.0, 2.0));
    balance.set_property("saturation", saturation.clamp(0.0, 2.0));
}

#[async_trait]
impl CaptureHandle for GstCaptureHandle {
    fn available_formats(&self, _stream: StreamKind) -> Vec<EncodingCandidate> {
        self.formats.clone()
    }

    async fn set_format(&mut self, stream: StreamKind, format: &EncodingCandidate) -> Result<()> {
        match stream {
            StreamKind::Preview => self.preview_format = Some(format.clone()),
            StreamKind::Record => self.record_format = Some(format.clone()),
        }
        if self.previewing && stream == StreamKind::Preview {
            self.rebuild()?;
        }
        Ok(())
    }

    async fn add_effect(
        &mut self,
        stream: StreamKind,
        effect_id: &str,
        properties: &PropertySet,
    ) -> Result<()> {
        if effect_id != IMAGING_EFFECT_ID {
            return Err(CameraError::platform(
                "add_effect",
                format!("effect {} is not registered", effect_id),
            )
            .into());
        }
        let config = ImagingEffectConfig::from_property_set(properties)?;
        self.effects.insert(stream, config);
        self.refresh_effect(stream);
        Ok(())
    }

    async fn clear_effects(&mut self, stream: StreamKind) -> Result<()> {
        self.effects.remove(&stream);
        self.refresh_effect(stream);
        Ok(())
    }

    async fn start_preview(&mut self) -> Result<()> {
        self.previewing = true;
        self.rebuild()
    }

    async fn stop_preview(&mut self) -> Result<()> {
        self.previewing = false;
        self.teardown();
        Ok(())
    }

    async fn start_record(&mut self, profile: &EncodingProfile, path: &Path) -> Result<()> {
        self.recording = Some((path.to_path_buf(), *profile));
        self.rebuild()
    }

    async fn stop_record(&mut self) -> Result<()> {
        if self.recording.is_none() {
            return Err(CaptureError::Recording {
                details: "no recording in progress".to_string(),
            }
            .into());
        }
        let finished = self.finish_recording().await;
        self.recording = None;
        if let Err(e) = finished {
            self.teardown();
            return Err(e);
        }
        if self.previewing {
            self.rebuild()?;
        } else {
            self.teardown();
        }
        Ok(())
    }

    fn focus_supported(&self) -> bool {
        false
    }

    async fn set_focus_preset(&mut self, preset: FocusPreset) -> Result<()> {
        Err(CameraError::platform(
            "set_focus_preset",
            format!("{:?} focus preset not supported by v4l2src", preset),
        )
        .into())
    }

    fn try_set_autofocus(&mut self, enabled: bool) -> bool {
        let Some(source) = self.pipeline.as_ref().and_then(|p| p.by_name("source")) else {
            return false;
        };
        let controls = gstreamer::Structure::builder("c")
            .field("focus_automatic_continuous", i32::from(enabled))
            .build();
        source.set_property("extra-controls", controls);
        true
    }

    async fn dispose(self: Box<Self>) -> Result<()> {
        let mut handle = self;
        let finished = match handle.recording.take() {
            Some(_) => handle.finish_recording().await,
            None => Ok(()),
        };
        handle.teardown();
        info!("Released GStreamer source {}", handle.device_path);
        finished
    }
}
