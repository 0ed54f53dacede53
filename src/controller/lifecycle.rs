use super::session::{CaptureSession, ControllerStats, RecordingToggle, SessionSnapshot};
use crate::camera::{
    list_device_details, list_format_details, log_format, select_device, select_preview_format,
    select_record_format, CaptureHandle, CapturePlatform, DeviceDescriptor, EncodingCandidate,
    EncodingProfile, FocusPreset, StreamKind,
};
use crate::config::EffectcamConfig;
use crate::effect::{ImagingEffectConfig, PropertySet};
use crate::error::{CameraError, CaptureError, Result};
use crate::events::{CaptureEvent, EventBus};
use crate::output::{OutputFile, SaveSuggestion};
use chrono::Local;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the capture session and drives it through the page lifecycle
///
/// All transitions go through a single session slot. Lifecycle transitions
/// wait for the slot, the record toggle is rejected while another transition
/// holds it.
pub struct CaptureController {
    platform: Arc<dyn CapturePlatform>,
    config: EffectcamConfig,
    effect: ImagingEffectConfig,
    effect_properties: PropertySet,
    event_bus: EventBus,
    devices: RwLock<Vec<DeviceDescriptor>>,
    output: RwLock<Option<OutputFile>>,
    session: Mutex<Option<CaptureSession>>,
    sessions_started: AtomicU64,
    sessions_stopped: AtomicU64,
    recordings_completed: AtomicU64,
}

impl CaptureController {
    pub fn new(platform: Arc<dyn CapturePlatform>, config: EffectcamConfig) -> Result<Self> {
        let effect = config.effect.imaging();
        effect.validate()?;
        let effect_properties = effect.to_property_set();
        let event_bus = EventBus::new(config.system.event_bus_capacity);

        info!(
            "Capture controller using {} platform, effect {} {}",
            platform.name(),
            config.effect.effect_id,
            effect
        );

        Ok(Self {
            platform,
            config,
            effect,
            effect_properties,
            event_bus,
            devices: RwLock::new(Vec::new()),
            output: RwLock::new(None),
            session: Mutex::new(None),
            sessions_started: AtomicU64::new(0),
            sessions_stopped: AtomicU64::new(0),
            recordings_completed: AtomicU64::new(0),
        })
    }

    /// Create the temporary output file, enumerate devices and start a session
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing capture controller");

        self.create_output().await?;
        self.refresh_devices().await?;
        self.start_session().await
    }

    /// Enumerate capture devices and log their details
    pub async fn refresh_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let devices = self.platform.enumerate_devices().await?;
        if devices.is_empty() {
            return Err(CameraError::NoDevice.into());
        }

        info!("Found {} video capture device(s)", devices.len());
        list_device_details(&devices);

        *self.devices.write() = devices.clone();
        Ok(devices)
    }

    /// Open a session on the preferred device and start the effect preview
    pub async fn start_session(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.start_locked(&mut slot).await
    }

    /// Stop preview and release the device; no-op without a session
    pub async fn stop_session(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.stop_locked(&mut slot).await
    }

    /// Move between previewing and recording
    pub async fn toggle_recording(&self) -> Result<RecordingToggle> {
        let mut slot = self
            .session
            .try_lock()
            .map_err(|_| CaptureError::TransitionInProgress)?;
        // a session only sits in the slot while its preview runs
        let session = slot.as_mut().ok_or(CaptureError::NoActiveSession)?;

        if session.is_recording {
            self.end_recording(session).await
        } else {
            self.begin_recording(session).await
        }
    }

    /// Start a session when the host becomes visible, stop it when hidden
    ///
    /// Repeated notifications of the same kind are collapsed.
    pub async fn on_visibility_changed(&self, visible: bool) -> Result<()> {
        self.event_bus.publish(CaptureEvent::VisibilityChanged {
            visible,
            timestamp: SystemTime::now(),
        });

        let mut slot = self.session.lock().await;
        match (visible, slot.is_some()) {
            (true, false) => self.start_locked(&mut slot).await,
            (false, true) => self.stop_locked(&mut slot).await,
            _ => {
                debug!(
                    "Visibility {} matches session state, ignoring",
                    if visible { "shown" } else { "hidden" }
                );
                Ok(())
            }
        }
    }

    pub async fn session(&self) -> Option<SessionSnapshot> {
        self.session.lock().await.as_ref().map(CaptureSession::snapshot)
    }

    pub async fn is_previewing(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_previewing)
    }

    pub async fn is_recording(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_recording)
    }

    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            sessions_started: self.sessions_started.load(Ordering::SeqCst),
            sessions_stopped: self.sessions_stopped.load(Ordering::SeqCst),
            recordings_completed: self.recordings_completed.load(Ordering::SeqCst),
        }
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.devices.read().clone()
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.read().as_ref().map(|o| o.path().to_path_buf())
    }

    pub fn effect(&self) -> &ImagingEffectConfig {
        &self.effect
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn create_output(&self) -> Result<OutputFile> {
        let output =
            OutputFile::create(&self.config.capture.temp_dir, &self.config.capture.file_name)
                .await?;
        *self.output.write() = Some(output.clone());
        Ok(output)
    }

    async fn ensure_output(&self) -> Result<OutputFile> {
        let existing = self.output.read().clone();
        match existing {
            Some(output) => Ok(output),
            None => self.create_output().await,
        }
    }

    async fn start_locked(&self, slot: &mut Option<CaptureSession>) -> Result<()> {
        if let Some(session) = slot.as_ref() {
            return Err(CaptureError::SessionAlreadyActive {
                session_id: session.id.clone(),
            }
            .into());
        }

        let session = self.open_session().await?;
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        self.event_bus.publish(CaptureEvent::SessionStarted {
            session_id: session.id.clone(),
            device_id: session.device.id.clone(),
            timestamp: SystemTime::now(),
        });
        *slot = Some(session);
        Ok(())
    }

    async fn stop_locked(&self, slot: &mut Option<CaptureSession>) -> Result<()> {
        let Some(session) = slot.take() else {
            debug!("No capture session to stop");
            return Ok(());
        };

        let session_id = session.id.clone();
        let result = self.close_session(session).await;

        self.sessions_stopped.fetch_add(1, Ordering::SeqCst);
        self.event_bus.publish(CaptureEvent::SessionStopped {
            session_id,
            timestamp: SystemTime::now(),
        });
        result
    }

    async fn open_session(&self) -> Result<CaptureSession> {
        let known = !self.devices.read().is_empty();
        if !known {
            self.refresh_devices().await?;
        }

        let device = {
            let devices = self.devices.read();
            select_device(&devices, self.config.camera.preferred_panel)?.clone()
        };
        info!("Starting capture on {} ({})", device.name, device.id);

        let mut handle = self.platform.open(&device.id).await?;
        match self.configure(&mut handle).await {
            Ok((preview_format, record_format)) => Ok(CaptureSession::new(
                handle,
                device,
                preview_format,
                record_format,
            )),
            Err(e) => {
                warn!("Capture start failed, releasing {}: {}", device.id, e);
                if let Err(dispose_err) = handle.dispose().await {
                    warn!("Failed to release {}: {}", device.id, dispose_err);
                }
                Err(e)
            }
        }
    }

    async fn configure(
        &self,
        handle: &mut Box<dyn CaptureHandle>,
    ) -> Result<(EncodingCandidate, EncodingCandidate)> {
        let preview_formats = handle.available_formats(StreamKind::Preview);
        let record_formats = handle.available_formats(StreamKind::Record);
        list_format_details("Preview", &preview_formats);
        list_format_details("Record", &record_formats);

        let preview_format =
            select_preview_format(&preview_formats, self.config.camera.preview_width)?.clone();
        log_format(0, &preview_format);
        handle
            .set_format(StreamKind::Preview, &preview_format)
            .await?;

        let record_format = select_record_format(&record_formats)?.clone();
        log_format(0, &record_format);
        handle.set_format(StreamKind::Record, &record_format).await?;

        handle
            .add_effect(
                StreamKind::Preview,
                &self.config.effect.effect_id,
                &self.effect_properties,
            )
            .await?;
        handle.start_preview().await?;

        if handle.focus_supported() {
            handle.set_focus_preset(FocusPreset::Manual).await?;
        } else if !handle.try_set_autofocus(false) {
            debug!("Device rejected disabling autofocus");
        }

        info!(
            "Preview running at {}, recording format {}",
            preview_format, record_format
        );
        Ok((preview_format, record_format))
    }

    async fn close_session(&self, mut session: CaptureSession) -> Result<()> {
        info!("Stopping capture session {}", session.id);

        let mut first_error = None;
        if session.is_recording {
            warn!("Session {} stopped while recording", session.id);
            match session.handle.stop_record().await {
                Ok(()) => {
                    session.is_recording = false;
                    self.recordings_completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => first_error = Some(e),
            }
        }

        session.is_previewing = false;
        if let Err(e) = session.handle.stop_preview().await {
            warn!("Failed to stop preview for {}: {}", session.id, e);
            first_error.get_or_insert(e);
        }

        if let Err(e) = session.handle.dispose().await {
            warn!("Failed to release session {}: {}", session.id, e);
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn begin_recording(&self, session: &mut CaptureSession) -> Result<RecordingToggle> {
        let output = self.ensure_output().await?;
        let profile = EncodingProfile::mp4(self.config.capture.quality);
        let effect_id = &self.config.effect.effect_id;

        session.handle.clear_effects(StreamKind::Preview).await?;
        session.effect_stream = None;

        let started = match session
            .handle
            .add_effect(StreamKind::Record, effect_id, &self.effect_properties)
            .await
        {
            Ok(()) => {
                session.effect_stream = Some(StreamKind::Record);
                session.handle.start_record(&profile, output.path()).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            warn!("Recording failed to start, restoring preview effect: {}", e);
            self.restore_preview_effect(session).await;
            return Err(e);
        }
        session.is_recording = true;

        info!("Recording {} to {}", profile, output.path().display());
        self.event_bus.publish(CaptureEvent::RecordingStarted {
            path: output.path().to_path_buf(),
            timestamp: SystemTime::now(),
        });
        Ok(RecordingToggle::Started {
            path: output.path().to_path_buf(),
        })
    }

    /// Move the effect back to the preview stream after a failed record start
    async fn restore_preview_effect(&self, session: &mut CaptureSession) {
        if let Err(e) = session.handle.clear_effects(StreamKind::Record).await {
            warn!("Failed to clear record effects: {}", e);
        }
        session.effect_stream = None;

        match session
            .handle
            .add_effect(
                StreamKind::Preview,
                &self.config.effect.effect_id,
                &self.effect_properties,
            )
            .await
        {
            Ok(()) => session.effect_stream = Some(StreamKind::Preview),
            Err(e) => warn!("Failed to re-attach preview effect: {}", e),
        }
    }

    async fn end_recording(&self, session: &mut CaptureSession) -> Result<RecordingToggle> {
        let output = self.ensure_output().await?;
        let effect_id = &self.config.effect.effect_id;

        session.handle.stop_record().await?;
        session.handle.clear_effects(StreamKind::Record).await?;
        session.effect_stream = None;
        session
            .handle
            .add_effect(StreamKind::Preview, effect_id, &self.effect_properties)
            .await?;
        session.effect_stream = Some(StreamKind::Preview);
        session.is_recording = false;
        self.recordings_completed.fetch_add(1, Ordering::SeqCst);

        let suggestion = SaveSuggestion::mp4(&output.file_name());
        let saved_to = match &self.config.capture.save_dir {
            Some(dir) => {
                let name = format!(
                    "{}_{}",
                    Local::now().format("%Y%m%d_%H%M%S"),
                    suggestion.suggested_name
                );
                match output.persist_to(dir, &name).await {
                    Ok(saved) => Some(saved),
                    Err(e) => {
                        warn!("Recording kept in temp dir, save failed: {}", e);
                        self.event_bus.publish(CaptureEvent::Fault {
                            operation: "save_recording".to_string(),
                            error: e.to_string(),
                        });
                        None
                    }
                }
            }
            None => {
                debug!(
                    "No save directory configured; recording stays at {} (suggested {:?})",
                    output.path().display(),
                    suggestion
                );
                None
            }
        };

        self.event_bus.publish(CaptureEvent::RecordingStopped {
            path: output.path().to_path_buf(),
            saved_to: saved_to.clone(),
            timestamp: SystemTime::now(),
        });
        Ok(RecordingToggle::Stopped {
            path: output.path().to_path_buf(),
            saved_to,
        })
    }
}
