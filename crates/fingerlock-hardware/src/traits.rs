//! Hardware device trait definitions.
//!
//! This module defines the contract between the lock controller and its
//! peripherals. The fingerprint sensor owns the template database and all
//! image processing; the controller only sequences its instructions. The
//! relay is a single digital output.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use fingerlock_core::{CharBuffer, OutputLevel, SlotId};
use fingerlock_protocol::SystemParameters;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::DeviceInfo;

/// Outcome of an image capture attempt.
///
/// An empty sensor is the common case while polling, so it is a value
/// rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageCapture {
    /// A finger image is now in the sensor's image buffer.
    Captured,

    /// No finger on the sensor.
    NoFinger,
}

impl ImageCapture {
    pub fn is_captured(&self) -> bool {
        matches!(self, ImageCapture::Captured)
    }
}

/// A stored template that matched a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Slot holding the matching template.
    pub slot: SlotId,

    /// Match confidence reported by the sensor.
    pub confidence: u16,
}

/// Fingerprint sensor module abstraction.
///
/// Implementations wrap a module that stores templates internally and
/// processes images in two character buffers. Every method maps to one
/// instruction; a module rejection is reported as
/// [`HardwareError::Sensor`](crate::HardwareError::Sensor) carrying the raw
/// confirmation code.
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generics (`S: FingerprintSensor`) or an enum wrapper.
///
/// # Examples
///
/// ```no_run
/// use fingerlock_core::{CharBuffer, SlotId};
/// use fingerlock_hardware::traits::FingerprintSensor;
/// use fingerlock_hardware::error::Result;
///
/// async fn store_both_captures<S: FingerprintSensor>(sensor: &mut S, slot: SlotId) -> Result<()> {
///     // Both buffers were filled by image_to_template beforehand
///     sensor.create_model().await?;
///     sensor.store_model(CharBuffer::One, slot).await
/// }
/// ```
pub trait FingerprintSensor: Send + Sync {
    /// Perform the password handshake.
    ///
    /// This is the detection probe: a module that answers it is present and
    /// accepts our credentials.
    async fn verify_password(&mut self) -> Result<()>;

    /// Read the system parameter block (capacity, security level, ...).
    async fn read_parameters(&mut self) -> Result<SystemParameters>;

    /// Number of templates currently stored.
    async fn template_count(&mut self) -> Result<u16>;

    /// Try to capture a finger image.
    async fn capture_image(&mut self) -> Result<ImageCapture>;

    /// Convert the captured image into a template in `buffer`.
    async fn image_to_template(&mut self, buffer: CharBuffer) -> Result<()>;

    /// Merge buffer 1 and buffer 2 into a model (left in both buffers).
    ///
    /// A [`ConfirmationCode::EnrollMismatch`](fingerlock_protocol::ConfirmationCode::EnrollMismatch)
    /// rejection means the two captures come from different fingers.
    async fn create_model(&mut self) -> Result<()>;

    /// Persist the template in `buffer` at `slot`.
    async fn store_model(&mut self, buffer: CharBuffer, slot: SlotId) -> Result<()>;

    /// Search `page_count` slots starting at `start_page` for the template in `buffer`.
    ///
    /// Returns `Ok(None)` when nothing matches.
    async fn search(
        &mut self,
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    ) -> Result<Option<SearchMatch>>;

    /// Erase every stored template.
    async fn empty_database(&mut self) -> Result<()>;

    /// Get device information.
    async fn get_device_info(&self) -> Result<DeviceInfo>;
}

/// Relay output abstraction.
///
/// The relay knows nothing about locks; the lock actuator decides which
/// level means "unlocked" for the installed wiring.
pub trait RelayDevice: Send + Sync {
    /// Drive the output to `level`.
    async fn set_level(&mut self, level: OutputLevel) -> Result<()>;

    /// Last level successfully driven, if any.
    fn level(&self) -> Option<OutputLevel>;

    /// Get device information.
    async fn get_device_info(&self) -> Result<DeviceInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_capture_is_captured() {
        assert!(ImageCapture::Captured.is_captured());
        assert!(!ImageCapture::NoFinger.is_captured());
    }

    #[test]
    fn test_search_match_serialization() {
        let found = SearchMatch {
            slot: SlotId::new(4).unwrap(),
            confidence: 120,
        };
        let json = serde_json::to_string(&found).unwrap();
        assert_eq!(json, r#"{"slot":4,"confidence":120}"#);
    }
}
