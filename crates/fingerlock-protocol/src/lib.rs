//! Packet protocol spoken by R30x/ZFM-family fingerprint modules.
//!
//! The module accepts command packets and answers each with exactly one
//! acknowledgement packet. This crate covers the wire format ([`Packet`]),
//! the instruction set ([`Command`]), the confirmation codes carried by
//! acknowledgements ([`ConfirmationCode`]), typed acknowledgement decoding
//! ([`Acknowledgement`]) and a Tokio codec ([`SensorCodec`]) for byte streams.

pub mod codec;
pub mod confirmation;
pub mod instruction;
pub mod packet;
pub mod response;

pub use codec::SensorCodec;
pub use confirmation::ConfirmationCode;
pub use instruction::{Command, Instruction};
pub use packet::{Packet, PacketKind, checksum};
pub use response::{Acknowledgement, SearchResult, SystemParameters};
