//! Instruction set of the fingerprint module.
//!
//! [`Instruction`] names the opcode; [`Command`] is an instruction together
//! with its parameters, ready to be turned into a command [`Packet`].

use bytes::{BufMut, BytesMut};
use fingerlock_core::CharBuffer;
use std::fmt;

use crate::Packet;

/// Instruction opcodes used by the door lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Capture a finger image into the image buffer (`GenImg`).
    GenImage,

    /// Convert the image buffer into a character file (`Img2Tz`).
    ImageToTemplate,

    /// Search the library for a character file (`Search`).
    Search,

    /// Merge both character buffers into a model (`RegModel`).
    RegisterModel,

    /// Store a character buffer into the library (`Store`).
    Store,

    /// Erase every template in the library (`Empty`).
    Empty,

    /// Read the system parameter block (`ReadSysPara`).
    ReadSystemParameters,

    /// Verify the module handshake password (`VfyPwd`).
    VerifyPassword,

    /// Read the number of stored templates (`TemplateNum`).
    TemplateCount,
}

impl Instruction {
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::GenImage => 0x01,
            Instruction::ImageToTemplate => 0x02,
            Instruction::Search => 0x04,
            Instruction::RegisterModel => 0x05,
            Instruction::Store => 0x06,
            Instruction::Empty => 0x0D,
            Instruction::ReadSystemParameters => 0x0F,
            Instruction::VerifyPassword => 0x13,
            Instruction::TemplateCount => 0x1D,
        }
    }

    /// Decode an opcode, returning `None` for instructions this crate does not use.
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x01 => Some(Instruction::GenImage),
            0x02 => Some(Instruction::ImageToTemplate),
            0x04 => Some(Instruction::Search),
            0x05 => Some(Instruction::RegisterModel),
            0x06 => Some(Instruction::Store),
            0x0D => Some(Instruction::Empty),
            0x0F => Some(Instruction::ReadSystemParameters),
            0x13 => Some(Instruction::VerifyPassword),
            0x1D => Some(Instruction::TemplateCount),
            _ => None,
        }
    }

    /// Datasheet mnemonic.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::GenImage => "GenImg",
            Instruction::ImageToTemplate => "Img2Tz",
            Instruction::Search => "Search",
            Instruction::RegisterModel => "RegModel",
            Instruction::Store => "Store",
            Instruction::Empty => "Empty",
            Instruction::ReadSystemParameters => "ReadSysPara",
            Instruction::VerifyPassword => "VfyPwd",
            Instruction::TemplateCount => "TemplateNum",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instruction with its parameters.
///
/// # Example
/// ```
/// use fingerlock_core::CharBuffer;
/// use fingerlock_protocol::Command;
///
/// let command = Command::Store { buffer: CharBuffer::One, page: 3 };
/// assert_eq!(command.payload(), vec![0x06, 0x01, 0x00, 0x03]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GenImage,
    ImageToTemplate(CharBuffer),
    Search {
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    },
    RegisterModel,
    Store {
        buffer: CharBuffer,
        page: u16,
    },
    Empty,
    ReadSystemParameters,
    VerifyPassword(u32),
    TemplateCount,
}

impl Command {
    pub fn instruction(&self) -> Instruction {
        match self {
            Command::GenImage => Instruction::GenImage,
            Command::ImageToTemplate(_) => Instruction::ImageToTemplate,
            Command::Search { .. } => Instruction::Search,
            Command::RegisterModel => Instruction::RegisterModel,
            Command::Store { .. } => Instruction::Store,
            Command::Empty => Instruction::Empty,
            Command::ReadSystemParameters => Instruction::ReadSystemParameters,
            Command::VerifyPassword(_) => Instruction::VerifyPassword,
            Command::TemplateCount => Instruction::TemplateCount,
        }
    }

    /// Command packet payload: opcode followed by big-endian parameters.
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(6);
        buf.put_u8(self.instruction().opcode());

        match *self {
            Command::ImageToTemplate(buffer) => buf.put_u8(buffer.as_u8()),
            Command::Search {
                buffer,
                start_page,
                page_count,
            } => {
                buf.put_u8(buffer.as_u8());
                buf.put_u16(start_page);
                buf.put_u16(page_count);
            }
            Command::Store { buffer, page } => {
                buf.put_u8(buffer.as_u8());
                buf.put_u16(page);
            }
            Command::VerifyPassword(password) => buf.put_u32(password),
            Command::GenImage
            | Command::RegisterModel
            | Command::Empty
            | Command::ReadSystemParameters
            | Command::TemplateCount => {}
        }

        buf.to_vec()
    }

    /// Build the command packet addressed to `address`.
    pub fn to_packet(&self, address: u32) -> Packet {
        Packet::command(address, self.payload())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ImageToTemplate(buffer) => write!(f, "Img2Tz({buffer})"),
            Command::Search {
                buffer,
                start_page,
                page_count,
            } => write!(f, "Search({buffer}, {start_page}+{page_count})"),
            Command::Store { buffer, page } => write!(f, "Store({buffer} -> {page})"),
            // Never log the password itself.
            Command::VerifyPassword(_) => write!(f, "VfyPwd"),
            other => write!(f, "{}", other.instruction()),
        }
    }
}
