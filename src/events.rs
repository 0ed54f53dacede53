use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Lifecycle events published by the capture controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureEvent {
    /// A capture session was opened and preview started
    SessionStarted {
        session_id: String,
        device_id: String,
        timestamp: SystemTime,
    },
    /// The capture session was released
    SessionStopped {
        session_id: String,
        timestamp: SystemTime,
    },
    /// Recording to the temporary output file began
    RecordingStarted { path: PathBuf, timestamp: SystemTime },
    /// Recording stopped; `saved_to` is set when the file was relocated
    RecordingStopped {
        path: PathBuf,
        saved_to: Option<PathBuf>,
        timestamp: SystemTime,
    },
    /// Host visibility changed
    VisibilityChanged { visible: bool, timestamp: SystemTime },
    /// A controller operation failed
    Fault { operation: String, error: String },
}

impl CaptureEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CaptureEvent::SessionStarted {
                session_id,
                device_id,
                ..
            } => format!("Session {} started on {}", session_id, device_id),
            CaptureEvent::SessionStopped { session_id, .. } => {
                format!("Session {} stopped", session_id)
            }
            CaptureEvent::RecordingStarted { path, .. } => {
                format!("Recording to {}", path.display())
            }
            CaptureEvent::RecordingStopped { path, saved_to, .. } => match saved_to {
                Some(saved) => format!(
                    "Recording {} stopped, saved to {}",
                    path.display(),
                    saved.display()
                ),
                None => format!("Recording {} stopped", path.display()),
            },
            CaptureEvent::VisibilityChanged { visible, .. } => {
                format!("Visibility changed: {}", if *visible { "visible" } else { "hidden" })
            }
            CaptureEvent::Fault { operation, error } => {
                format!("{} failed: {}", operation, error)
            }
        }
    }

    /// Serialize the event for structured logs
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CaptureEvent::SessionStarted { .. } => "session_started",
            CaptureEvent::SessionStopped { .. } => "session_stopped",
            CaptureEvent::RecordingStarted { .. } => "recording_started",
            CaptureEvent::RecordingStopped { .. } => "recording_stopped",
            CaptureEvent::VisibilityChanged { .. } => "visibility_changed",
            CaptureEvent::Fault { .. } => "fault",
        }
    }
}

/// Broadcast bus for controller events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CaptureEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: CaptureEvent) {
        match &event {
            CaptureEvent::Fault { .. } => warn!("{}", event.description()),
            CaptureEvent::SessionStarted { .. } | CaptureEvent::RecordingStopped { .. } => {
                info!("{}", event.description())
            }
            _ => debug!("{}", event.description()),
        }

        if self.sender.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(4);
        let mut receiver = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(CaptureEvent::VisibilityChanged {
            visible: true,
            timestamp: SystemTime::now(),
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "visibility_changed");
        assert_eq!(event.description(), "Visibility changed: visible");
    }

    #[test]
    fn test_event_json() {
        let event = CaptureEvent::Fault {
            operation: "toggle_recording".to_string(),
            error: "No capture session is active".to_string(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"Fault\""));
        assert!(json.contains("toggle_recording"));

        let parsed: CaptureEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(0);
        bus.publish(CaptureEvent::Fault {
            operation: "start_session".to_string(),
            error: "no camera".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
