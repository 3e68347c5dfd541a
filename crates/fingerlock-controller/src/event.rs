//! Human-readable status events.
//!
//! The controller reports everything an operator should see as a
//! [`ControllerEvent`]. Each event renders as one line of text.

use std::fmt;

use fingerlock_core::{LockState, SlotId};
use tokio::sync::mpsc;
use tracing::trace;

use crate::command::Command;
use crate::enrollment::{EnrollmentState, FailureReason};

/// A status update from the door controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The sensor answered the startup handshake.
    SensorReady { template_count: u16, capacity: u16 },

    CommandReceived(Command),

    /// A control line that is not a command.
    UnknownCommand(String),

    EnrollmentStarted { slot: SlotId },

    /// An enrollment entered a new intermediate state.
    EnrollmentProgress { slot: SlotId, state: EnrollmentState },

    Enrolled { slot: SlotId },

    EnrollmentFailed { slot: SlotId, reason: FailureReason },

    /// Enrollment refused before touching the sensor.
    DatabaseFull { count: u16, capacity: u16 },

    DatabaseCleared,

    ClearFailed { reason: String },

    Matched { slot: SlotId, confidence: u16 },

    /// A finger was read but matched nothing. Only sent when enabled.
    Rejected,

    LockChanged(LockState),
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerEvent::SensorReady {
                template_count,
                capacity,
            } => write!(
                f,
                "Found fingerprint sensor: {template_count} of {capacity} templates stored"
            ),
            ControllerEvent::CommandReceived(command) => write!(f, "Command: {command}"),
            ControllerEvent::UnknownCommand(line) => {
                write!(f, "Unknown command \"{line}\" (expected enroll or clear)")
            }
            ControllerEvent::EnrollmentStarted { slot } => write!(f, "Enrolling ID {slot}"),
            ControllerEvent::EnrollmentProgress { slot, state } => {
                write!(f, "[{slot}] {}", state.prompt())
            }
            ControllerEvent::Enrolled { slot } => {
                write!(f, "Fingerprint {slot} saved successfully")
            }
            ControllerEvent::EnrollmentFailed { slot, reason } => {
                write!(f, "Enrollment of {slot} failed: {reason}")
            }
            ControllerEvent::DatabaseFull { count, capacity } => {
                write!(f, "Database full ({count}/{capacity}), cannot enroll")
            }
            ControllerEvent::DatabaseCleared => write!(f, "Fingerprint database cleared"),
            ControllerEvent::ClearFailed { reason } => {
                write!(f, "Failed to clear database: {reason}")
            }
            ControllerEvent::Matched { slot, confidence } => {
                write!(f, "Found ID {slot} with confidence {confidence}")
            }
            ControllerEvent::Rejected => write!(f, "Fingerprint not recognised"),
            ControllerEvent::LockChanged(state) => write!(f, "Door {state}"),
        }
    }
}

/// Where the controller sends its status events.
///
/// Sending never blocks and never fails: once the receiver is gone, events
/// are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ControllerEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn discard() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ControllerEvent) {
        trace!(%event, "Status event");
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerlock_protocol::ConfirmationCode;
    use rstest::rstest;

    fn slot(id: u16) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[rstest]
    #[case(
        ControllerEvent::SensorReady { template_count: 3, capacity: 50 },
        "Found fingerprint sensor: 3 of 50 templates stored"
    )]
    #[case(ControllerEvent::EnrollmentStarted { slot: slot(1) }, "Enrolling ID #1")]
    #[case(
        ControllerEvent::EnrollmentProgress { slot: slot(1), state: EnrollmentState::StoreModel },
        "[#1] Fingerprint model created"
    )]
    #[case(ControllerEvent::Enrolled { slot: slot(1) }, "Fingerprint #1 saved successfully")]
    #[case(
        ControllerEvent::EnrollmentFailed { slot: slot(2), reason: FailureReason::Mismatch },
        "Enrollment of #2 failed: fingerprints did not match"
    )]
    #[case(
        ControllerEvent::DatabaseFull { count: 50, capacity: 50 },
        "Database full (50/50), cannot enroll"
    )]
    #[case(
        ControllerEvent::Matched { slot: slot(7), confidence: 88 },
        "Found ID #7 with confidence 88"
    )]
    #[case(ControllerEvent::LockChanged(LockState::Unlocked), "Door unlocked")]
    #[case(ControllerEvent::CommandReceived(Command::Clear), "Command: clear")]
    fn test_event_display(#[case] event: ControllerEvent, #[case] expected: &str) {
        assert_eq!(event.to_string(), expected);
    }

    #[test]
    fn test_store_failure_shows_raw_code() {
        let event = ControllerEvent::EnrollmentFailed {
            slot: slot(4),
            reason: FailureReason::StoreFailed {
                code: ConfirmationCode::FlashError,
            },
        };
        assert!(event.to_string().contains("0x18"));
    }

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(ControllerEvent::DatabaseCleared);
        sink.emit(ControllerEvent::Rejected);

        assert_eq!(rx.recv().await, Some(ControllerEvent::DatabaseCleared));
        assert_eq!(rx.recv().await, Some(ControllerEvent::Rejected));
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_ignored() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(ControllerEvent::DatabaseCleared);
        EventSink::discard().emit(ControllerEvent::Rejected);
    }
}
