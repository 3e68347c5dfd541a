//! Integration tests for SensorCodec against realistic serial traffic.
//!
//! These tests feed the decoder the way a UART delivers bytes: in arbitrary
//! chunks, with line noise before the first packet.

use bytes::BytesMut;
use fingerlock_core::CharBuffer;
use fingerlock_protocol::{Acknowledgement, Command, ConfirmationCode, Packet, SensorCodec};
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};

const ADDR: u32 = 0xFFFF_FFFF;

fn wire(packet: &Packet) -> Vec<u8> {
    let mut buf = BytesMut::new();
    SensorCodec::new().encode(packet.clone(), &mut buf).unwrap();
    buf.to_vec()
}

/// Decode every packet from `bytes`, delivered in chunks of `chunk` bytes.
fn decode_chunked(bytes: &[u8], chunk: usize) -> Vec<Packet> {
    let mut codec = SensorCodec::new();
    let mut buf = BytesMut::new();
    let mut packets = Vec::new();

    for piece in bytes.chunks(chunk.max(1)) {
        buf.extend_from_slice(piece);
        while let Some(packet) = codec.decode(&mut buf).unwrap() {
            packets.push(packet);
        }
    }

    packets
}

#[test]
fn test_enrollment_exchange_acknowledgements() {
    // The module's replies during a successful enrollment, back to back.
    let replies = [
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
        Acknowledgement::new(ConfirmationCode::NoFinger, Vec::new()),
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
        Acknowledgement::new(ConfirmationCode::Ok, Vec::new()),
    ];

    let mut stream = Vec::new();
    for reply in &replies {
        stream.extend(wire(&reply.to_packet(ADDR)));
    }

    let decoded: Vec<Acknowledgement> = decode_chunked(&stream, 3)
        .into_iter()
        .map(|p| Acknowledgement::try_from(p).unwrap())
        .collect();

    assert_eq!(decoded, replies);
}

#[test]
fn test_search_reply_after_power_up_noise() {
    let mut stream = vec![0x00, 0x00, 0x55, 0xEF, 0x00];
    let reply = Acknowledgement::new(ConfirmationCode::Ok, vec![0x00, 0x01, 0x00, 0x64]);
    stream.extend(wire(&reply.to_packet(ADDR)));

    let packets = decode_chunked(&stream, 1);
    assert_eq!(packets.len(), 1);

    let ack = Acknowledgement::try_from(packets[0].clone()).unwrap();
    let result = ack.search_result().unwrap();
    assert_eq!(result.page_id, 1);
    assert_eq!(result.score, 100);
}

#[test]
fn test_corrupted_packet_does_not_block_following_packet() {
    let mut corrupted = wire(&Command::GenImage.to_packet(ADDR));
    let last = corrupted.len() - 1;
    corrupted[last] = corrupted[last].wrapping_add(1);
    let good = Command::ImageToTemplate(CharBuffer::One).to_packet(ADDR);

    let mut buf = BytesMut::from(&corrupted[..]);
    buf.extend_from_slice(&wire(&good));

    let mut codec = SensorCodec::new();
    assert!(codec.decode(&mut buf).is_err());
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(good));
}

proptest! {
    /// Property: noise that contains no start code never hides the packet after it,
    /// whatever the chunking of the stream.
    #[test]
    fn prop_packet_survives_noise_and_chunking(
        noise in prop::collection::vec(0u8..=0xEE, 0..64),
        page in 1u16..=1000,
        chunk in 1usize..16,
    ) {
        let packet = Command::Store { buffer: CharBuffer::One, page }.to_packet(ADDR);
        let mut stream = noise;
        stream.extend(wire(&packet));

        let packets = decode_chunked(&stream, chunk);
        prop_assert_eq!(packets, vec![packet]);
    }
}
