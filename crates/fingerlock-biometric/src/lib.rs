//! Fingerprint sensor drivers for the fingerprint door lock.
//!
//! This crate provides the production [`FingerprintSensor`] implementation
//! for R30x/ZFM-family modules attached over a UART. For the mock sensor used
//! in development and testing, see `fingerlock_hardware::mock`.
//!
//! [`FingerprintSensor`]: fingerlock_hardware::FingerprintSensor

pub mod serial;
#[cfg(unix)]
pub mod stream;

pub use serial::{SerialSensor, SerialSensorConfig};
#[cfg(unix)]
pub use stream::SerialStream;
