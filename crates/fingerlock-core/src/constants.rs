//! Core constants for the fingerprint door lock.
//!
//! This module defines the wire-level constants of the sensor packet protocol
//! and the default timings of the control loop. They are shared by the
//! protocol codec, the serial driver, the controller and the CLI configuration
//! so every layer agrees on the same defaults.
//!
//! # Packet Structure
//!
//! The fingerprint module speaks a binary, big-endian packet format:
//!
//! ```text
//! | 0xEF01 | ADDRESS (4) | PID (1) | LENGTH (2) | PAYLOAD ... | CHECKSUM (2) |
//! ```
//!
//! Where:
//! - `0xEF01` - Start code marking the beginning of every packet
//! - `ADDRESS` - Module address (factory default `0xFFFFFFFF`)
//! - `PID` - Packet identifier (command, data, acknowledgement, end of data)
//! - `LENGTH` - Payload length plus the two checksum bytes
//! - `CHECKSUM` - Low 16 bits of the sum of PID, LENGTH and PAYLOAD bytes
//!
//! # Usage
//!
//! ```
//! use fingerlock_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(START_CODE, 0xEF01);
//! let hold = Duration::from_millis(DEFAULT_UNLOCK_HOLD_MS);
//! assert_eq!(hold.as_secs(), 10);
//! ```

// ============================================================================
// Packet Framing
// ============================================================================

/// Start code that opens every packet.
pub const START_CODE: u16 = 0xEF01;

/// Factory default module address.
pub const DEFAULT_SENSOR_ADDRESS: u32 = 0xFFFF_FFFF;

/// Factory default module password.
pub const DEFAULT_SENSOR_PASSWORD: u32 = 0x0000_0000;

/// Bytes before the payload: start code (2), address (4), PID (1), length (2).
pub const PACKET_HEADER_LEN: usize = 9;

/// Checksum trailer length in bytes.
pub const CHECKSUM_LEN: usize = 2;

/// Largest payload the module accepts in a single packet.
///
/// The module negotiates data packets of 32-256 bytes; command and
/// acknowledgement packets are far smaller.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Largest complete packet on the wire.
pub const MAX_PACKET_LEN: usize = PACKET_HEADER_LEN + MAX_PAYLOAD_LEN + CHECKSUM_LEN;

// ============================================================================
// Serial Link
// ============================================================================

/// Default UART baud rate of the module (9600 x 6).
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default serial device path on the host.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyS0";

/// Default time to wait for an acknowledgement packet (milliseconds).
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1_000;

// ============================================================================
// Template Database
// ============================================================================

/// Lowest valid template slot ID.
///
/// Slot IDs are handed out sequentially starting at 1; page 0 is never used.
pub const MIN_SLOT_ID: u16 = 1;

// ============================================================================
// Control Loop Timing
// ============================================================================

/// Main loop tick interval (milliseconds).
pub const DEFAULT_TICK_MS: u64 = 100;

/// Maximum wait for a finger during each enrollment capture (milliseconds).
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 10_000;

/// Interval between image capture attempts while waiting for a finger (milliseconds).
pub const DEFAULT_CAPTURE_POLL_MS: u64 = 50;

/// Interval between presence checks while waiting for finger removal (milliseconds).
pub const DEFAULT_REMOVAL_POLL_MS: u64 = 50;

/// How long the door stays unlocked after a match (milliseconds).
pub const DEFAULT_UNLOCK_HOLD_MS: u64 = 10_000;

// ============================================================================
// Relay
// ============================================================================

/// Default GPIO line driving the relay.
pub const DEFAULT_RELAY_GPIO: u32 = 17;

/// Relay wiring convention: asserting the line low unlocks the door.
pub const DEFAULT_RELAY_ACTIVE_LOW: bool = true;
