use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Packet framing errors
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("Unknown packet identifier: {0:#04x}")]
    UnknownPacketKind(u8),

    #[error("Truncated acknowledgement for {instruction}: need {expected} bytes, got {actual}")]
    TruncatedAcknowledgement {
        instruction: &'static str,
        expected: usize,
        actual: usize,
    },

    // Template database errors
    #[error("Invalid slot ID: {0}")]
    InvalidSlot(String),

    #[error("Template database full ({count}/{capacity})")]
    DatabaseFull { count: u16, capacity: u16 },

    #[error("Invalid character buffer: {0}")]
    InvalidBuffer(u8),

    // Control flow errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    // IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
