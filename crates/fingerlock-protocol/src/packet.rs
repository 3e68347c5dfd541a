use bytes::{BufMut, Bytes, BytesMut};
use fingerlock_core::{Error, Result, constants::*};
use std::fmt;

/// Packet identifier byte following the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Host-to-module command (`0x01`).
    Command,

    /// Data packet with more data to follow (`0x02`).
    Data,

    /// Module-to-host acknowledgement (`0x07`).
    Acknowledgement,

    /// Last data packet of a transfer (`0x08`).
    EndOfData,
}

impl PacketKind {
    pub fn as_u8(&self) -> u8 {
        match self {
            PacketKind::Command => 0x01,
            PacketKind::Data => 0x02,
            PacketKind::Acknowledgement => 0x07,
            PacketKind::EndOfData => 0x08,
        }
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(PacketKind::Command),
            0x02 => Ok(PacketKind::Data),
            0x07 => Ok(PacketKind::Acknowledgement),
            0x08 => Ok(PacketKind::EndOfData),
            other => Err(Error::UnknownPacketKind(other)),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Command => write!(f, "command"),
            PacketKind::Data => write!(f, "data"),
            PacketKind::Acknowledgement => write!(f, "ack"),
            PacketKind::EndOfData => write!(f, "end-of-data"),
        }
    }
}

/// Compute the packet checksum.
///
/// The checksum is the low 16 bits of the sum of the packet identifier,
/// both length bytes and every payload byte.
///
/// # Example
/// ```
/// use fingerlock_protocol::{PacketKind, checksum};
///
/// // GenImg: PID 0x01, length 0x0003, payload [0x01]
/// assert_eq!(checksum(PacketKind::Command, &[0x01]), 0x0005);
/// ```
pub fn checksum(kind: PacketKind, payload: &[u8]) -> u16 {
    let length = (payload.len() + CHECKSUM_LEN) as u16;
    let [len_hi, len_lo] = length.to_be_bytes();
    payload.iter().fold(
        u16::from(kind.as_u8())
            .wrapping_add(u16::from(len_hi))
            .wrapping_add(u16::from(len_lo)),
        |sum, byte| sum.wrapping_add(u16::from(*byte)),
    )
}

/// Packet represents one unit of the module's wire protocol
///
/// A packet carries the module address, a packet identifier and a payload.
/// The start code, length field and checksum are derived when encoding
/// and verified when decoding, so they are not stored.
///
/// # Wire Format
/// ```text
/// EF 01 | FF FF FF FF | 01 | 00 03 | 01 | 00 05
/// start   address       PID  length  ins  checksum
/// ```
///
/// # Basic Usage
/// ```
/// use bytes::BytesMut;
/// use fingerlock_protocol::{Packet, PacketKind};
///
/// let packet = Packet::command(0xFFFF_FFFF, vec![0x01]);
/// let mut buf = BytesMut::new();
/// packet.encode(&mut buf).unwrap();
///
/// assert_eq!(
///     &buf[..],
///     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Module address the packet is sent to or received from
    address: u32,

    /// Packet identifier
    kind: PacketKind,

    /// Payload bytes (instruction + parameters, or confirmation + data)
    payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(address: u32, kind: PacketKind, payload: impl Into<Bytes>) -> Self {
        Packet {
            address,
            kind,
            payload: payload.into(),
        }
    }

    /// Create a command packet.
    pub fn command(address: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(address, PacketKind::Command, payload)
    }

    /// Create an acknowledgement packet.
    pub fn acknowledgement(address: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(address, PacketKind::Acknowledgement, payload)
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the packet, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Total encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        PACKET_HEADER_LEN + self.payload.len() + CHECKSUM_LEN
    }

    /// Checksum this packet will carry on the wire.
    pub fn checksum(&self) -> u16 {
        checksum(self.kind, &self.payload)
    }

    /// Append the wire encoding of this packet to `dst`.
    ///
    /// # Errors
    /// Returns `Error::FrameTooLarge` if the payload exceeds [`MAX_PAYLOAD_LEN`].
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::FrameTooLarge {
                size: self.wire_len(),
                max_size: MAX_PACKET_LEN,
            });
        }

        dst.reserve(self.wire_len());
        dst.put_u16(START_CODE);
        dst.put_u32(self.address);
        dst.put_u8(self.kind.as_u8());
        dst.put_u16((self.payload.len() + CHECKSUM_LEN) as u16);
        dst.put_slice(&self.payload);
        dst.put_u16(self.checksum());
        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{:08X} [", self.kind, self.address)?;
        for (i, byte) in self.payload.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_gen_img() {
        assert_eq!(checksum(PacketKind::Command, &[0x01]), 0x0005);
    }

    #[test]
    fn test_checksum_verify_password() {
        // 01 + 00 + 07 + 13 + 00 00 00 00 = 0x1B
        assert_eq!(
            checksum(PacketKind::Command, &[0x13, 0x00, 0x00, 0x00, 0x00]),
            0x001B
        );
    }

    #[test]
    fn test_checksum_wraps() {
        let payload = vec![0xFF; MAX_PAYLOAD_LEN];
        let expected = (0x02u32 + 0x01 + 0x02 + 0xFF * MAX_PAYLOAD_LEN as u32) as u16;
        assert_eq!(checksum(PacketKind::Data, &payload), expected);
    }

    #[test]
    fn test_encode_ack() {
        let packet = Packet::acknowledgement(0xFFFF_FFFF, vec![0x00]);
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(
            &bytes[..],
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0A]
        );
        assert_eq!(bytes.len(), packet.wire_len());
    }

    #[test]
    fn test_encode_custom_address() {
        let packet = Packet::command(0x1234_5678, vec![0x1D]);
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(&bytes[2..6], &[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_encode_rejects_oversize_payload() {
        let packet = Packet::new(0, PacketKind::Data, vec![0u8; MAX_PAYLOAD_LEN + 1]);
        let mut buf = BytesMut::new();
        assert!(matches!(
            packet.encode(&mut buf),
            Err(Error::FrameTooLarge { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_packet_kind_roundtrip() {
        for kind in [
            PacketKind::Command,
            PacketKind::Data,
            PacketKind::Acknowledgement,
            PacketKind::EndOfData,
        ] {
            assert_eq!(PacketKind::try_from(kind.as_u8()).unwrap(), kind);
        }
        assert!(PacketKind::try_from(0x05).is_err());
    }

    #[test]
    fn test_display() {
        let packet = Packet::command(0xFFFF_FFFF, vec![0x02, 0x01]);
        assert_eq!(packet.to_string(), "command @FFFFFFFF [02 01]");
    }
}
