//! Confirmation codes returned in acknowledgement packets.
//!
//! The first payload byte of every acknowledgement is a confirmation code.
//! `0x00` means success; everything else names a specific failure. Codes
//! the module may return but that this crate does not name are preserved
//! in [`ConfirmationCode::Other`] so they can still be reported verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result code carried by an acknowledgement packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationCode {
    /// Command executed successfully (`0x00`).
    Ok,

    /// Error when receiving the command packet (`0x01`).
    PacketReceiveError,

    /// No finger on the sensor (`0x02`).
    NoFinger,

    /// Failed to enroll the finger image (`0x03`).
    ImageFail,

    /// Image too disorderly to generate a character file (`0x06`).
    ImageMessy,

    /// Image lacks enough feature points (`0x07`).
    FeatureFail,

    /// Fingers do not match (`0x08`).
    NoMatch,

    /// No matching template in the library (`0x09`).
    NotFound,

    /// Character files from both buffers cannot be combined (`0x0A`).
    EnrollMismatch,

    /// Page ID beyond the library (`0x0B`).
    BadLocation,

    /// Error reading a template from the library (`0x0C`).
    DbReadFail,

    /// Error uploading a character file (`0x0D`).
    UploadFeatureFail,

    /// Module cannot receive the following data packets (`0x0E`).
    PacketResponseFail,

    /// Error uploading an image (`0x0F`).
    UploadFail,

    /// Failed to delete a template (`0x10`).
    DeleteFail,

    /// Failed to clear the library (`0x11`).
    DbClearFail,

    /// Wrong password (`0x13`).
    PasswordFail,

    /// No valid primary image in the image buffer (`0x15`).
    InvalidImage,

    /// Error writing flash (`0x18`).
    FlashError,

    /// Invalid register number (`0x1A`).
    InvalidRegister,

    /// Any code not listed above.
    Other(u8),
}

impl ConfirmationCode {
    /// Decode a raw confirmation byte.
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMessy,
            0x07 => Self::FeatureFail,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::DbReadFail,
            0x0D => Self::UploadFeatureFail,
            0x0E => Self::PacketResponseFail,
            0x0F => Self::UploadFail,
            0x10 => Self::DeleteFail,
            0x11 => Self::DbClearFail,
            0x13 => Self::PasswordFail,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            0x1A => Self::InvalidRegister,
            other => Self::Other(other),
        }
    }

    /// Raw byte as transmitted on the wire.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketReceiveError => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageFail => 0x03,
            Self::ImageMessy => 0x06,
            Self::FeatureFail => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::EnrollMismatch => 0x0A,
            Self::BadLocation => 0x0B,
            Self::DbReadFail => 0x0C,
            Self::UploadFeatureFail => 0x0D,
            Self::PacketResponseFail => 0x0E,
            Self::UploadFail => 0x0F,
            Self::DeleteFail => 0x10,
            Self::DbClearFail => 0x11,
            Self::PasswordFail => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashError => 0x18,
            Self::InvalidRegister => 0x1A,
            Self::Other(code) => *code,
        }
    }

    /// Whether the command succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PacketReceiveError => "communication error",
            Self::NoFinger => "no finger detected",
            Self::ImageFail => "imaging error",
            Self::ImageMessy => "image too messy",
            Self::FeatureFail => "could not find fingerprint features",
            Self::NoMatch => "fingerprints do not match",
            Self::NotFound => "no match found",
            Self::EnrollMismatch => "fingerprints did not match",
            Self::BadLocation => "location out of range",
            Self::DbReadFail => "error reading template",
            Self::UploadFeatureFail => "error uploading features",
            Self::PacketResponseFail => "cannot receive data packets",
            Self::UploadFail => "error uploading image",
            Self::DeleteFail => "could not delete template",
            Self::DbClearFail => "could not clear database",
            Self::PasswordFail => "wrong password",
            Self::InvalidImage => "invalid image",
            Self::FlashError => "error writing to flash",
            Self::InvalidRegister => "invalid register",
            Self::Other(_) => "unknown error",
        }
    }
}

impl From<u8> for ConfirmationCode {
    fn from(code: u8) -> Self {
        Self::from_u8(code)
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {:#04x})", self.description(), self.as_u8())
    }
}
