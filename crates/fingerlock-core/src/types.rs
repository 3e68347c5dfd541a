use crate::{
    Result,
    constants::MIN_SLOT_ID,
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Template slot identifier inside the sensor's database.
///
/// Slots are numbered from 1; the upper bound is the sensor's capacity,
/// which is only known at runtime and checked by the slot allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SlotId(u16);

impl SlotId {
    /// Create a new slot ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the ID is 0.
    pub fn new(id: u16) -> Result<Self> {
        if id < MIN_SLOT_ID {
            return Err(Error::InvalidSlot(format!(
                "Slot ID must be at least {MIN_SLOT_ID}, got {id}"
            )));
        }
        Ok(SlotId(id))
    }

    /// Get the raw slot ID as u16 (the sensor's page number).
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u16 = s
            .trim()
            .trim_start_matches('#')
            .parse()
            .map_err(|_| Error::InvalidSlot(format!("Invalid slot ID: {s}")))?;
        SlotId::new(id)
    }
}

impl TryFrom<u16> for SlotId {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        SlotId::new(value)
    }
}

impl From<SlotId> for u16 {
    fn from(slot: SlotId) -> Self {
        slot.0
    }
}

/// One of the two transient character buffers inside the sensor.
///
/// Image-to-template conversion writes into a buffer; model creation merges
/// both buffers; search and store read from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharBuffer {
    /// Buffer 1 (first capture, search input, merged model output).
    One,

    /// Buffer 2 (second capture).
    Two,
}

impl CharBuffer {
    /// Wire identifier of the buffer (1 or 2).
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            CharBuffer::One => 1,
            CharBuffer::Two => 2,
        }
    }

    /// Zero-based index, convenient for array-backed buffers.
    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.as_u8() - 1)
    }
}

impl TryFrom<u8> for CharBuffer {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CharBuffer::One),
            2 => Ok(CharBuffer::Two),
            other => Err(Error::InvalidBuffer(other)),
        }
    }
}

impl fmt::Display for CharBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "buffer {}", self.as_u8())
    }
}

/// Logical state of the door lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    /// Relay output level that realises this state for the given wiring.
    ///
    /// With `active_low` wiring the relay is asserted (door unlocked) by
    /// driving the line low.
    #[must_use]
    pub fn output_level(&self, active_low: bool) -> OutputLevel {
        match (self, active_low) {
            (LockState::Unlocked, true) | (LockState::Locked, false) => OutputLevel::Low,
            (LockState::Unlocked, false) | (LockState::Locked, true) => OutputLevel::High,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Locked => write!(f, "locked"),
            LockState::Unlocked => write!(f, "unlocked"),
        }
    }
}

/// Electrical level of a digital output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLevel {
    Low,
    High,
}

impl OutputLevel {
    /// Value written to a sysfs `value` file.
    #[must_use]
    pub fn as_sysfs_value(&self) -> &'static str {
        match self {
            OutputLevel::Low => "0",
            OutputLevel::High => "1",
        }
    }

    /// Value written to a sysfs `direction` file to make the line an output
    /// that starts at this level.
    #[must_use]
    pub fn as_sysfs_direction(&self) -> &'static str {
        match self {
            OutputLevel::Low => "low",
            OutputLevel::High => "high",
        }
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputLevel::Low => write!(f, "LOW"),
            OutputLevel::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", 1)]
    #[case("#12", 12)]
    #[case(" 200 ", 200)]
    fn test_slot_id_valid(#[case] input: &str, #[case] expected: u16) {
        let slot: SlotId = input.parse().unwrap();
        assert_eq!(slot.as_u16(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("abc")]
    #[case("70000")]
    fn test_slot_id_invalid(#[case] input: &str) {
        assert!(input.parse::<SlotId>().is_err());
    }

    #[test]
    fn test_slot_id_display() {
        assert_eq!(SlotId::new(7).unwrap().to_string(), "#7");
    }

    #[test]
    fn test_slot_id_serde_rejects_zero() {
        assert!(serde_json::from_str::<SlotId>("0").is_err());
        let slot: SlotId = serde_json::from_str("3").unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "3");
    }

    #[rstest]
    #[case(1, CharBuffer::One)]
    #[case(2, CharBuffer::Two)]
    fn test_char_buffer_from_u8(#[case] raw: u8, #[case] expected: CharBuffer) {
        assert_eq!(CharBuffer::try_from(raw).unwrap(), expected);
        assert_eq!(expected.as_u8(), raw);
    }

    #[test]
    fn test_char_buffer_invalid() {
        assert!(matches!(
            CharBuffer::try_from(3),
            Err(Error::InvalidBuffer(3))
        ));
    }

    #[rstest]
    #[case(LockState::Unlocked, true, OutputLevel::Low)]
    #[case(LockState::Locked, true, OutputLevel::High)]
    #[case(LockState::Unlocked, false, OutputLevel::High)]
    #[case(LockState::Locked, false, OutputLevel::Low)]
    fn test_lock_state_output_level(
        #[case] state: LockState,
        #[case] active_low: bool,
        #[case] level: OutputLevel,
    ) {
        assert_eq!(state.output_level(active_low), level);
    }

    #[rstest]
    #[case(OutputLevel::Low, "0", "low")]
    #[case(OutputLevel::High, "1", "high")]
    fn test_output_level_sysfs_strings(
        #[case] level: OutputLevel,
        #[case] value: &str,
        #[case] direction: &str,
    ) {
        assert_eq!(level.as_sysfs_value(), value);
        assert_eq!(level.as_sysfs_direction(), direction);
    }
}
