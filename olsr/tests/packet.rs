//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;

use const_addrs::{ip4, net4};
use olsr::packet::{
    DecodeError, HelloMessage, HnaMessage, LinkCode, LinkMessage, Message,
    MessageBody, MessageHdr, MidMessage, Packet, TcMessage,
};
use olsr::types::{LinkType, NeighborType, Willingness};

//
// Helper functions.
//

fn test_encode_packet(bytes_expected: &[u8], pkt: &Packet) {
    let (bytes_actual, truncated) = pkt.encode(usize::MAX);
    assert!(!truncated);
    assert_eq!(bytes_expected, bytes_actual.as_ref());
}

fn test_decode_packet(bytes: &[u8], pkt_expected: &Packet) {
    let pkt_actual = Packet::decode(bytes).unwrap();
    assert_eq!(*pkt_expected, pkt_actual);
}

//
// Test packets.
//

static HELLO1: Lazy<(Vec<u8>, Packet)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x1c, 0x00, 0x01, // packet length 28, seqno 1
            0x01, 0x86, 0x00, 0x18, // HELLO, vtime 6s, size 24
            0xc0, 0x00, 0x02, 0x01, // origin 192.0.2.1
            0x01, 0x00, 0x00, 0x05, // ttl 1, hops 0, seqno 5
            0x00, 0x00, 0x05, 0x03, // reserved, htime 2s, willingness 3
            0x06, 0x00, 0x00, 0x08, // link code SYM/SYM_NEIGH, size 8
            0xc0, 0x00, 0x02, 0x02, // 192.0.2.2
        ],
        Packet::new(
            1,
            vec![Message::new(
                MessageHdr::new(0x86, ip4!("192.0.2.1"), 1, 0, 5),
                MessageBody::Hello(HelloMessage::new(
                    0x05,
                    Willingness::DEFAULT,
                    vec![LinkMessage::new(
                        LinkCode::new(LinkType::Sym, NeighborType::SymNeigh),
                        vec![ip4!("192.0.2.2")],
                    )],
                )),
            )],
        ),
    )
});

static TC1: Lazy<(Vec<u8>, Packet)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x18, 0x00, 0x02, // packet length 24, seqno 2
            0x02, 0xe7, 0x00, 0x14, // TC, vtime 15s, size 20
            0xc0, 0x00, 0x02, 0x02, // origin 192.0.2.2
            0xff, 0x01, 0x00, 0x09, // ttl 255, hops 1, seqno 9
            0x00, 0x07, 0x00, 0x00, // ANSN 7, reserved
            0xc0, 0x00, 0x02, 0x03, // 192.0.2.3
        ],
        Packet::new(
            2,
            vec![Message::new(
                MessageHdr::new(0xe7, ip4!("192.0.2.2"), 255, 1, 9),
                MessageBody::Tc(TcMessage::new(7, vec![ip4!("192.0.2.3")])),
            )],
        ),
    )
});

static MID1: Lazy<(Vec<u8>, Packet)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x14, 0x00, 0x03, // packet length 20, seqno 3
            0x03, 0xe7, 0x00, 0x10, // MID, vtime 15s, size 16
            0xc0, 0x00, 0x02, 0x02, // origin 192.0.2.2
            0xff, 0x00, 0x00, 0x0a, // ttl 255, hops 0, seqno 10
            0xc0, 0x00, 0x02, 0x0c, // 192.0.2.12
        ],
        Packet::new(
            3,
            vec![Message::new(
                MessageHdr::new(0xe7, ip4!("192.0.2.2"), 255, 0, 10),
                MessageBody::Mid(MidMessage::new(vec![ip4!("192.0.2.12")])),
            )],
        ),
    )
});

static HNA1: Lazy<(Vec<u8>, Packet)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x18, 0x00, 0x04, // packet length 24, seqno 4
            0x04, 0xe7, 0x00, 0x14, // HNA, vtime 15s, size 20
            0xc0, 0x00, 0x02, 0x02, // origin 192.0.2.2
            0xff, 0x00, 0x00, 0x0b, // ttl 255, hops 0, seqno 11
            0xcb, 0x00, 0x71, 0x00, // 203.0.113.0
            0xff, 0xff, 0xff, 0x00, // 255.255.255.0
        ],
        Packet::new(
            4,
            vec![Message::new(
                MessageHdr::new(0xe7, ip4!("192.0.2.2"), 255, 0, 11),
                MessageBody::Hna(HnaMessage::new(vec![net4!(
                    "203.0.113.0/24"
                )])),
            )],
        ),
    )
});

//
// Tests.
//

#[test]
fn test_encode_hello1() {
    let (bytes, pkt) = &*HELLO1;
    test_encode_packet(bytes, pkt);
}

#[test]
fn test_decode_hello1() {
    let (bytes, pkt) = &*HELLO1;
    test_decode_packet(bytes, pkt);
}

#[test]
fn test_encode_tc1() {
    let (bytes, pkt) = &*TC1;
    test_encode_packet(bytes, pkt);
}

#[test]
fn test_decode_tc1() {
    let (bytes, pkt) = &*TC1;
    test_decode_packet(bytes, pkt);
}

#[test]
fn test_encode_mid1() {
    let (bytes, pkt) = &*MID1;
    test_encode_packet(bytes, pkt);
}

#[test]
fn test_decode_mid1() {
    let (bytes, pkt) = &*MID1;
    test_decode_packet(bytes, pkt);
}

#[test]
fn test_encode_hna1() {
    let (bytes, pkt) = &*HNA1;
    test_encode_packet(bytes, pkt);
}

#[test]
fn test_decode_hna1() {
    let (bytes, pkt) = &*HNA1;
    test_decode_packet(bytes, pkt);
}

#[test]
fn test_decode_multiple_messages() {
    // One packet carrying a TC and a MID back to back.
    let (tc_bytes, tc_pkt) = &*TC1;
    let (mid_bytes, mid_pkt) = &*MID1;

    let mut bytes = vec![0x00, 0x28, 0x00, 0x09];
    bytes.extend_from_slice(&tc_bytes[4..]);
    bytes.extend_from_slice(&mid_bytes[4..]);

    let pkt = Packet::decode(&bytes).unwrap();
    assert_eq!(pkt.seqno, 9);
    assert_eq!(pkt.messages.len(), 2);
    assert_eq!(pkt.messages[0], tc_pkt.messages[0]);
    assert_eq!(pkt.messages[1], mid_pkt.messages[0]);
}

#[test]
fn test_decode_unknown_message_preserved() {
    let bytes = vec![
        0x00, 0x14, 0x00, 0x05, // packet length 20, seqno 5
        0x80, 0xa8, 0x00, 0x10, // unknown type 128, vtime, size 16
        0xc0, 0x00, 0x02, 0x02, // origin 192.0.2.2
        0x0a, 0x02, 0x00, 0x0c, // ttl 10, hops 2, seqno 12
        0xde, 0xad, 0xbe, 0xef, // opaque body
    ];

    let pkt = Packet::decode(&bytes).unwrap();
    assert_eq!(pkt.messages.len(), 1);
    let msg = &pkt.messages[0];
    assert_eq!(msg.msg_type(), 128);
    let unknown = msg.body.as_unknown().unwrap();
    assert_eq!(unknown.data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);

    // Reencoding an unknown message reproduces the original bytes.
    let (reencoded, _) = pkt.encode(usize::MAX);
    assert_eq!(bytes, reencoded.as_ref());
}

#[test]
fn test_decode_truncated() {
    // Fewer bytes than the packet header.
    assert_eq!(Packet::decode(&[0x00]), Err(DecodeError::Truncated));

    // Claimed packet length exceeds the datagram.
    let bytes = vec![0x00, 0xff, 0x00, 0x01];
    assert_eq!(Packet::decode(&bytes), Err(DecodeError::Truncated));

    // Claimed message size exceeds the packet.
    let (hello_bytes, _) = &*HELLO1;
    let mut bytes = hello_bytes.clone();
    bytes[6] = 0x00;
    bytes[7] = 0xff;
    assert_eq!(Packet::decode(&bytes), Err(DecodeError::Truncated));
}

#[test]
fn test_decode_bad_message_length() {
    // Message size smaller than the message header.
    let (hello_bytes, _) = &*HELLO1;
    let mut bytes = hello_bytes.clone();
    bytes[6] = 0x00;
    bytes[7] = 0x04;
    assert_eq!(
        Packet::decode(&bytes),
        Err(DecodeError::BadMessageLength(4))
    );
}

#[test]
fn test_decode_bad_link_code() {
    // Link code with reserved bits set; the HELLO is recorded as a message
    // error, not a packet error.
    let (hello_bytes, _) = &*HELLO1;
    let mut bytes = hello_bytes.clone();
    bytes[20] = 0xf6;

    let pkt = Packet::decode(&bytes).unwrap();
    assert!(pkt.messages.is_empty());
    assert_eq!(pkt.msg_errors, vec![DecodeError::BadLinkCode(0xf6)]);
}

#[test]
fn test_decode_bad_prefix() {
    // Noncontiguous HNA netmask.
    let (hna_bytes, _) = &*HNA1;
    let mut bytes = hna_bytes.clone();
    bytes[23] = 0x01;

    let pkt = Packet::decode(&bytes).unwrap();
    assert!(pkt.messages.is_empty());
    assert_eq!(
        pkt.msg_errors,
        vec![DecodeError::InvalidPrefix(
            ip4!("203.0.113.0"),
            ip4!("255.255.255.1")
        )]
    );
}

#[test]
fn test_encode_mtu_truncation() {
    // Two messages, but only the first fits within the size limit.
    let (_, tc_pkt) = &*TC1;
    let (_, mid_pkt) = &*MID1;
    let pkt = Packet::new(
        1,
        vec![tc_pkt.messages[0].clone(), mid_pkt.messages[0].clone()],
    );

    let (buf, truncated) = pkt.encode(24);
    assert!(truncated);

    let decoded = Packet::decode(&buf).unwrap();
    assert_eq!(decoded.messages.len(), 1);
    assert_eq!(decoded.messages[0], tc_pkt.messages[0]);
}

#[test]
fn test_update_encoded_seqno() {
    let (_, pkt) = &*HELLO1;
    let (mut buf, _) = pkt.encode(usize::MAX);
    Packet::update_encoded_seqno(&mut buf, 0xabcd);

    let decoded = Packet::decode(&buf).unwrap();
    assert_eq!(decoded.seqno, 0xabcd);
}
