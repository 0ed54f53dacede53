use super::keyboard_input::KeyboardInputHandler;
use super::types::{AppCommand, ShutdownReason};
use crate::controller::{CaptureController, RecordingToggle};
use crate::error::{EffectcamError, Result};
use crate::events::CaptureEvent;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Application coordinator driving the capture controller from user commands
pub struct EffectcamApp {
    pub(super) controller: Arc<CaptureController>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) command_sender: UnboundedSender<AppCommand>,
    pub(super) command_receiver: Option<UnboundedReceiver<AppCommand>>,
    pub(super) visible: bool,
    pub(super) cancellation_token: CancellationToken,
}

impl EffectcamApp {
    pub fn new(controller: Arc<CaptureController>, keyboard_enabled: bool) -> Self {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let keyboard_handler =
            keyboard_enabled.then(|| KeyboardInputHandler::new(command_sender.clone()));

        Self {
            controller,
            keyboard_handler,
            command_sender,
            command_receiver: Some(command_receiver),
            visible: false,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Sender for injecting commands into the application loop
    pub fn command_sender(&self) -> UnboundedSender<AppCommand> {
        self.command_sender.clone()
    }

    pub fn controller(&self) -> &Arc<CaptureController> {
        &self.controller
    }

    /// Initialize the controller; the host starts out visible
    pub async fn initialize(&mut self) -> Result<()> {
        self.controller.initialize().await.map_err(|e| {
            self.report_fault("initialize", &e);
            e
        })?;
        self.visible = true;
        Ok(())
    }

    /// Apply one command, returning the shutdown reason when the loop should exit
    pub async fn handle_command(&mut self, command: AppCommand) -> Option<ShutdownReason> {
        match command {
            AppCommand::ToggleRecording => match self.controller.toggle_recording().await {
                Ok(RecordingToggle::Started { path }) => {
                    info!("Recording started: {}", path.display());
                }
                Ok(RecordingToggle::Stopped { path, saved_to }) => match saved_to {
                    Some(saved) => info!("Recording saved to {}", saved.display()),
                    None => info!("Recording stopped: {}", path.display()),
                },
                Err(e) => self.report_fault("toggle_recording", &e),
            },
            AppCommand::ToggleVisibility => {
                self.visible = !self.visible;
                info!(
                    "Simulating host {}",
                    if self.visible { "shown" } else { "hidden" }
                );
                if let Err(e) = self.controller.on_visibility_changed(self.visible).await {
                    self.report_fault("visibility_changed", &e);
                }
            }
            AppCommand::Shutdown(reason) => return Some(reason),
        }
        None
    }

    fn report_fault(&self, operation: &str, error: &EffectcamError) {
        self.controller.event_bus().publish(CaptureEvent::Fault {
            operation: operation.to_string(),
            error: error.to_string(),
        });
    }
}
