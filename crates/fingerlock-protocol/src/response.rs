//! Typed decoding of acknowledgement packets.

use bytes::{Buf, Bytes};
use fingerlock_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::{ConfirmationCode, Instruction, Packet, PacketKind};

/// Size of the `ReadSysPara` parameter block.
const SYSTEM_PARAMETERS_LEN: usize = 16;

/// Acknowledgement of a single command.
///
/// Holds the confirmation code and any instruction-specific data that
/// follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    code: ConfirmationCode,
    data: Bytes,
}

impl Acknowledgement {
    pub fn new(code: ConfirmationCode, data: impl Into<Bytes>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }

    pub fn code(&self) -> ConfirmationCode {
        self.code
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Convert back to a packet, as the module would send it.
    pub fn to_packet(&self, address: u32) -> Packet {
        let mut payload = Vec::with_capacity(1 + self.data.len());
        payload.push(self.code.as_u8());
        payload.extend_from_slice(&self.data);
        Packet::acknowledgement(address, payload)
    }

    /// Page ID and match score of a successful `Search`.
    pub fn search_result(&self) -> Result<SearchResult> {
        let mut data = self.require(Instruction::Search, 4)?;
        Ok(SearchResult {
            page_id: data.get_u16(),
            score: data.get_u16(),
        })
    }

    /// Stored template count from `TemplateNum`.
    pub fn template_count(&self) -> Result<u16> {
        let mut data = self.require(Instruction::TemplateCount, 2)?;
        Ok(data.get_u16())
    }

    /// Parameter block from `ReadSysPara`.
    pub fn system_parameters(&self) -> Result<SystemParameters> {
        let mut data = self.require(Instruction::ReadSystemParameters, SYSTEM_PARAMETERS_LEN)?;
        Ok(SystemParameters {
            status_register: data.get_u16(),
            system_id: data.get_u16(),
            capacity: data.get_u16(),
            security_level: data.get_u16(),
            device_address: data.get_u32(),
            packet_size_code: data.get_u16(),
            baud_multiplier: data.get_u16(),
        })
    }

    fn require(&self, instruction: Instruction, expected: usize) -> Result<Bytes> {
        if self.data.len() < expected {
            return Err(Error::TruncatedAcknowledgement {
                instruction: instruction.name(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(self.data.clone())
    }
}

impl TryFrom<Packet> for Acknowledgement {
    type Error = Error;

    fn try_from(packet: Packet) -> Result<Self> {
        if packet.kind() != PacketKind::Acknowledgement {
            return Err(Error::InvalidPacket(format!(
                "expected acknowledgement, got {} packet",
                packet.kind()
            )));
        }

        let mut payload = packet.into_payload();
        if payload.is_empty() {
            return Err(Error::InvalidPacket(
                "acknowledgement without confirmation code".to_string(),
            ));
        }

        let code = ConfirmationCode::from_u8(payload.get_u8());
        Ok(Self {
            code,
            data: payload,
        })
    }
}

/// Outcome of a successful library search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Library page holding the matching template.
    pub page_id: u16,

    /// Match confidence reported by the module.
    pub score: u16,
}

/// System parameter block reported by `ReadSysPara`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParameters {
    pub status_register: u16,
    pub system_id: u16,

    /// Template library size (number of storable templates).
    pub capacity: u16,

    /// Matching threshold level, 1 (lenient) to 5 (strict).
    pub security_level: u16,
    pub device_address: u32,

    /// Data packet size: 0 = 32, 1 = 64, 2 = 128, 3 = 256 bytes.
    pub packet_size_code: u16,

    /// Baud rate as a multiple of 9600.
    pub baud_multiplier: u16,
}

impl SystemParameters {
    /// Data packet length in bytes.
    pub fn packet_size(&self) -> usize {
        32 << (self.packet_size_code.min(3) as usize)
    }

    /// Configured UART baud rate.
    pub fn baud_rate(&self) -> u32 {
        u32::from(self.baud_multiplier) * 9600
    }

    /// Encode as the 16-byte block the module transmits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SYSTEM_PARAMETERS_LEN);
        out.extend_from_slice(&self.status_register.to_be_bytes());
        out.extend_from_slice(&self.system_id.to_be_bytes());
        out.extend_from_slice(&self.capacity.to_be_bytes());
        out.extend_from_slice(&self.security_level.to_be_bytes());
        out.extend_from_slice(&self.device_address.to_be_bytes());
        out.extend_from_slice(&self.packet_size_code.to_be_bytes());
        out.extend_from_slice(&self.baud_multiplier.to_be_bytes());
        out
    }
}
