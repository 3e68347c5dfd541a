//! Controller errors.
//!
//! Per-operation failures (a timed out capture, a rejected store) are
//! reported as status events and never surface here. Only conditions that
//! stop the controller as a whole do.

use fingerlock_hardware::HardwareError;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The sensor did not answer the startup handshake.
    #[error("Fingerprint sensor not detected")]
    SensorNotDetected(#[source] HardwareError),

    /// The relay could not be driven to the locked level.
    #[error("Failed to lock door")]
    Relay(#[source] HardwareError),
}
