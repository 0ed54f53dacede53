use super::types::{AppCommand, ShutdownReason};
use super::EffectcamApp;
use crate::error::{EffectcamError, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

impl EffectcamApp {
    /// Run the command loop until a shutdown is requested
    pub async fn run(&mut self) -> Result<i32> {
        info!("Effectcam is running");

        let mut commands = self
            .command_receiver
            .take()
            .ok_or_else(|| EffectcamError::system("Command receiver already taken"))?;

        self.setup_signal_handlers(self.command_sender.clone());
        self.spawn_event_logger();

        if let Some(keyboard) = &self.keyboard_handler {
            keyboard.start().await?;
        }

        let reason = loop {
            let Some(command) = commands.recv().await else {
                break ShutdownReason::Error("Command channel closed unexpectedly".to_string());
            };
            if let Some(reason) = self.handle_command(command).await {
                break reason;
            }
        };

        info!("Shutdown initiated: {:?}", reason);

        let exit_code = self.shutdown().await?;

        info!("Effectcam shutdown complete");
        Ok(exit_code)
    }

    /// Log every controller event as JSON until shutdown
    fn spawn_event_logger(&self) {
        let mut events = self.controller.event_bus().subscribe();
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => match event.to_json() {
                            Ok(json) => debug!(event_type = event.event_type(), "{}", json),
                            Err(e) => warn!("Failed to serialize event: {}", e),
                        },
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Event logger lagged, skipped {} events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, commands: UnboundedSender<AppCommand>) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let commands = commands.clone();
            let token = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        let _ = commands.send(AppCommand::Shutdown(ShutdownReason::Signal(
                            "SIGTERM".to_string(),
                        )));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    let _ = commands.send(AppCommand::Shutdown(ShutdownReason::Signal(
                        "SIGINT".to_string(),
                    )));
                }
            }
        });
    }
}
