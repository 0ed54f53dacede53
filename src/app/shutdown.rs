use super::EffectcamApp;
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl EffectcamApp {
    /// Stop input handling and release the capture session
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if let Some(keyboard) = &self.keyboard_handler {
            if let Err(e) = keyboard.stop().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }

        match timeout(STOP_TIMEOUT, self.controller.stop_session()).await {
            Ok(Ok(())) => info!("Capture session released"),
            Ok(Err(e)) => {
                error!("Error stopping capture session: {}", e);
                exit_code = 1;
            }
            Err(_) => {
                error!("Timed out stopping capture session after {:?}", STOP_TIMEOUT);
                exit_code = 1;
            }
        }

        let stats = self.controller.stats();
        info!(
            "Sessions started: {}, stopped: {}, recordings: {}",
            stats.sessions_started, stats.sessions_stopped, stats.recordings_completed
        );

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
