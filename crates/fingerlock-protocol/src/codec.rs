//! Tokio codec for sensor packet framing.
//!
//! This module provides a Tokio-compatible codec that frames the module's
//! binary packets on a byte stream. It implements:
//! - [`Decoder`]: Extracts complete, checksum-verified packets from a serial byte stream
//! - [`Encoder<Packet>`]: Writes packets in wire format
//!
//! # Resynchronisation
//!
//! Serial lines pick up noise, especially right after the module powers up.
//! The decoder discards any bytes that precede a start code (`0xEF01`). When a
//! header announces an impossible length, or a complete packet fails its
//! checksum, the decoder consumes the offending bytes and returns an error;
//! the next call resumes scanning from the following byte.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use fingerlock_protocol::{PacketKind, SensorCodec};
//!
//! let mut codec = SensorCodec::new();
//! // Line noise, then an acknowledgement with confirmation code 0x00
//! let mut buffer = BytesMut::from(
//!     &[0x55, 0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0A][..],
//! );
//!
//! let packet = codec.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(packet.kind(), PacketKind::Acknowledgement);
//! assert!(buffer.is_empty());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::{Packet, PacketKind, checksum};
use fingerlock_core::{Error, Result, constants::*};

const START_CODE_BYTES: [u8; 2] = START_CODE.to_be_bytes();

/// Tokio codec for the module's packet protocol.
#[derive(Debug, Clone)]
pub struct SensorCodec {
    /// Largest payload accepted by the decoder.
    max_payload_len: usize,
}

impl SensorCodec {
    /// Create a new codec accepting payloads up to [`MAX_PAYLOAD_LEN`].
    pub fn new() -> Self {
        Self {
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }

    /// Create a codec with a custom payload limit.
    ///
    /// The limit is clamped to [`MAX_PAYLOAD_LEN`], which is the most the
    /// module can ever send.
    pub fn with_max_payload_len(max_payload_len: usize) -> Self {
        Self {
            max_payload_len: max_payload_len.min(MAX_PAYLOAD_LEN),
        }
    }

    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// Drop everything before the first start code.
    ///
    /// Returns `false` if no start code is buffered. A trailing `0xEF` is
    /// kept because it may be the first half of a start code.
    fn skip_to_start_code(src: &mut BytesMut) -> bool {
        match src
            .windows(START_CODE_BYTES.len())
            .position(|window| window == START_CODE_BYTES)
        {
            Some(0) => true,
            Some(pos) => {
                trace!(discarded = pos, "Skipping bytes before start code");
                src.advance(pos);
                true
            }
            None => {
                let keep = usize::from(src.last() == Some(&START_CODE_BYTES[0]));
                let discard = src.len() - keep;
                if discard > 0 {
                    trace!(discarded = discard, "No start code in buffer");
                    src.advance(discard);
                }
                false
            }
        }
    }
}

impl Default for SensorCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SensorCodec {
    type Item = Packet;
    type Error = Error;

    /// Decode one packet from the byte stream.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Packet))` - A complete packet with a valid checksum
    /// - `Ok(None)` - Need more data
    /// - `Err(Error)` - A malformed packet was consumed; calling again resumes after it
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        if !Self::skip_to_start_code(src) || src.len() < PACKET_HEADER_LEN {
            return Ok(None);
        }

        let length = usize::from(u16::from_be_bytes([src[7], src[8]]));
        if length < CHECKSUM_LEN || length - CHECKSUM_LEN > self.max_payload_len {
            // Not a real header; step over the start code and rescan later.
            src.advance(START_CODE_BYTES.len());
            return Err(Error::FrameTooLarge {
                size: PACKET_HEADER_LEN + length,
                max_size: PACKET_HEADER_LEN + self.max_payload_len + CHECKSUM_LEN,
            });
        }

        let total = PACKET_HEADER_LEN + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(START_CODE_BYTES.len());
        let address = frame.get_u32();
        let raw_kind = frame.get_u8();
        frame.advance(2); // length, already read
        let payload = frame.split_to(length - CHECKSUM_LEN).freeze();
        let received = frame.get_u16();

        let kind = PacketKind::try_from(raw_kind)?;
        let expected = checksum(kind, &payload);
        if expected != received {
            return Err(Error::ChecksumMismatch {
                expected,
                actual: received,
            });
        }

        let packet = Packet::new(address, kind, payload);
        trace!(%packet, "Decoded packet");
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for SensorCodec {
    type Error = Error;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        if item.payload().len() > self.max_payload_len {
            return Err(Error::FrameTooLarge {
                size: item.wire_len(),
                max_size: PACKET_HEADER_LEN + self.max_payload_len + CHECKSUM_LEN,
            });
        }
        item.encode(dst)
    }
}
