use super::types::{AppCommand, ShutdownReason};
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keyboard controls for the capture controller
pub struct KeyboardInputHandler {
    commands: UnboundedSender<AppCommand>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(commands: UnboundedSender<AppCommand>) -> Self {
        Self {
            commands,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard controls: SPACE/r record, v visibility, q/ESC quit");

        let commands = self.commands.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(command) = command_for_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        let quit = matches!(command, AppCommand::Shutdown(_));
                        if commands.send(command).is_err() {
                            debug!("Application loop gone, keyboard handler stopping");
                            break;
                        }
                        if quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}

/// Map a pressed key to an application command
pub fn command_for_key(code: KeyCode) -> Option<AppCommand> {
    match code {
        KeyCode::Char(' ') | KeyCode::Char('r') => Some(AppCommand::ToggleRecording),
        KeyCode::Char('v') => Some(AppCommand::ToggleVisibility),
        KeyCode::Char('q') | KeyCode::Esc => {
            Some(AppCommand::Shutdown(ShutdownReason::UserRequest))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            command_for_key(KeyCode::Char(' ')),
            Some(AppCommand::ToggleRecording)
        );
        assert_eq!(
            command_for_key(KeyCode::Char('r')),
            Some(AppCommand::ToggleRecording)
        );
        assert_eq!(
            command_for_key(KeyCode::Char('v')),
            Some(AppCommand::ToggleVisibility)
        );
        assert_eq!(
            command_for_key(KeyCode::Esc),
            Some(AppCommand::Shutdown(ShutdownReason::UserRequest))
        );
        assert_eq!(command_for_key(KeyCode::Char('x')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let handler = KeyboardInputHandler::new(sender);

        assert!(!handler.cancellation_token.is_cancelled());
        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
