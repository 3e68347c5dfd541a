//! Match sequencer: one capture and search attempt per tick.

use fingerlock_core::CharBuffer;
use fingerlock_hardware::{FingerprintSensor, ImageCapture, Result, SearchMatch};
use fingerlock_protocol::ConfirmationCode;
use tracing::debug;

/// First library page searched. Slots start at 1.
const SEARCH_START_PAGE: u16 = 1;

/// Result of a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing on the sensor.
    NoFinger,

    /// The module could not take a usable image.
    CaptureFailed(ConfirmationCode),

    /// The image could not be converted to a template.
    ConversionFailed(ConfirmationCode),

    /// A finger was read but matched no stored template.
    NoMatch,

    Matched(SearchMatch),
}

/// Runs the capture → convert → search sequence.
///
/// The sequencer is stateless between scans: a finger left on the sensor is
/// simply scanned again on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSequencer {
    capacity: u16,
}

impl MatchSequencer {
    /// Search slots `1..=capacity`.
    pub fn new(capacity: u16) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Scan once.
    ///
    /// Module rejections become [`ScanOutcome`] values. Only link failures
    /// (timeouts, I/O, framing) are returned as errors.
    pub async fn scan_once<S: FingerprintSensor>(&self, sensor: &mut S) -> Result<ScanOutcome> {
        match sensor.capture_image().await {
            Ok(ImageCapture::Captured) => {}
            Ok(ImageCapture::NoFinger) => return Ok(ScanOutcome::NoFinger),
            Err(e) => {
                return match e.confirmation_code() {
                    Some(code) => Ok(ScanOutcome::CaptureFailed(code)),
                    None => Err(e),
                };
            }
        }
        debug!("Finger captured, converting");

        if let Err(e) = sensor.image_to_template(CharBuffer::One).await {
            return match e.confirmation_code() {
                Some(code) => Ok(ScanOutcome::ConversionFailed(code)),
                None => Err(e),
            };
        }

        match sensor
            .search(CharBuffer::One, SEARCH_START_PAGE, self.capacity)
            .await
        {
            Ok(Some(found)) => Ok(ScanOutcome::Matched(found)),
            Ok(None) => Ok(ScanOutcome::NoMatch),
            Err(e) if e.confirmation_code().is_some() => {
                debug!(error = %e, "Search rejected");
                Ok(ScanOutcome::NoMatch)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerlock_core::SlotId;
    use fingerlock_hardware::HardwareError;
    use fingerlock_hardware::mock::MockSensor;
    use fingerlock_protocol::Instruction;

    fn slot(id: u16) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_no_finger_stops_after_capture() {
        let (mut sensor, _handle) = MockSensor::new();
        let outcome = MatchSequencer::new(50).scan_once(&mut sensor).await.unwrap();

        assert_eq!(outcome, ScanOutcome::NoFinger);
        assert_eq!(sensor.instructions(), &[Instruction::GenImage]);
    }

    #[tokio::test]
    async fn test_enrolled_finger_matches() {
        let (mut sensor, handle) = MockSensor::builder()
            .with_template(slot(3), vec![3, 3, 3])
            .build();
        handle.place_finger(vec![3, 3, 3], 90).await.unwrap();

        let outcome = MatchSequencer::new(50).scan_once(&mut sensor).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Matched(found) if found.slot == slot(3)));
    }

    #[tokio::test]
    async fn test_unknown_finger_is_no_match() {
        let (mut sensor, handle) = MockSensor::builder()
            .with_template(slot(1), vec![1])
            .build();
        handle.place_finger(vec![2], 90).await.unwrap();

        let outcome = MatchSequencer::new(50).scan_once(&mut sensor).await.unwrap();
        assert_eq!(outcome, ScanOutcome::NoMatch);
    }

    #[tokio::test]
    async fn test_poor_image_skips_search() {
        let (mut sensor, handle) = MockSensor::builder()
            .with_template(slot(1), vec![1])
            .build();
        handle.place_finger(vec![1], 10).await.unwrap();

        let outcome = MatchSequencer::new(50).scan_once(&mut sensor).await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::ConversionFailed(ConfirmationCode::ImageMessy)
        );
        assert!(!sensor.instructions().contains(&Instruction::Search));
    }

    #[tokio::test]
    async fn test_search_covers_last_slot() {
        let (mut sensor, handle) = MockSensor::builder()
            .with_capacity(10)
            .with_template(slot(10), vec![10])
            .build();
        handle.place_finger(vec![10], 90).await.unwrap();

        let outcome = MatchSequencer::new(10).scan_once(&mut sensor).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Matched(found) if found.slot == slot(10)));
    }

    #[tokio::test]
    async fn test_link_failure_is_error() {
        let (mut sensor, _handle) = MockSensor::builder().unresponsive().build();
        let result = MatchSequencer::new(50).scan_once(&mut sensor).await;
        assert!(matches!(result, Err(HardwareError::Timeout { .. })));
    }
}
