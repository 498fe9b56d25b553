//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use derive_new::new;
use enum_as_inner::EnumAsInner;
use ipnetwork::Ipv4Network;
use num_traits::FromPrimitive;
use olsr_utils::bytes::{BytesExt, BytesMutExt, TLS_BUF};
use serde::{Deserialize, Serialize};

use crate::types::{LinkType, NeighborType, Willingness};

//
// The OLSR packet format is:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         Packet Length         |    Packet Sequence Number     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Message Type |     Vtime     |         Message Size          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                      Originator Address                       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Time To Live |   Hop Count   |    Message Sequence Number    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                            MESSAGE                            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Packet {
    // Packet sequence number, specific to the transmitting interface.
    pub seqno: u16,
    // List of control messages.
    pub messages: Vec<Message>,
    // List of messages that failed to be decoded.
    #[new(default)]
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub msg_errors: Vec<DecodeError>,
}

// An OLSR control message: the shared header plus a type-specific body.
#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Message {
    pub hdr: MessageHdr,
    pub body: MessageBody,
}

#[derive(Clone, Copy, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct MessageHdr {
    // Validity time in the 8-bit wire format.
    pub vtime: u8,
    // Main address of the message originator.
    pub origin: Ipv4Addr,
    pub ttl: u8,
    pub hop_count: u8,
    // Originator-scoped message sequence number.
    pub seqno: u16,
}

#[derive(Clone, Debug, EnumAsInner, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum MessageBody {
    Hello(HelloMessage),
    Tc(TcMessage),
    Mid(MidMessage),
    Hna(HnaMessage),
    // Any message type this node does not decode. The body is preserved
    // verbatim so the default forwarding algorithm still applies to it.
    Unknown(UnknownMessage),
}

#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct HelloMessage {
    // Advertised HELLO emission interval in the 8-bit wire format.
    pub htime: u8,
    pub willingness: Willingness,
    pub links: Vec<LinkMessage>,
}

// A group of neighbor interface addresses sharing one link code.
#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LinkMessage {
    pub code: LinkCode,
    pub addrs: Vec<Ipv4Addr>,
}

#[derive(Clone, Copy, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LinkCode {
    pub link_type: LinkType,
    pub neighbor_type: NeighborType,
}

#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct TcMessage {
    // Advertised neighbor sequence number.
    pub ansn: u16,
    pub neighbors: Vec<Ipv4Addr>,
}

#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct MidMessage {
    // Interface addresses of the originator, main address excluded.
    pub interfaces: Vec<Ipv4Addr>,
}

#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct HnaMessage {
    pub networks: Vec<Ipv4Network>,
}

#[derive(Clone, Debug, Eq, new, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct UnknownMessage {
    pub msg_type: u8,
    pub data: Bytes,
}

// OLSR decode errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    Truncated,
    BadPacketLength(u16),
    BadMessageLength(u16),
    BadMessageType(u8),
    BadLinkCode(u8),
    InvalidPrefix(Ipv4Addr, Ipv4Addr),
}

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// ===== impl Packet =====

impl Packet {
    pub const HDR_LENGTH: usize = 4;

    /// Encodes the packet, appending as many messages as fit within
    /// `max_size` bytes.
    ///
    /// Messages are never split: a message which would push the packet past
    /// `max_size` is dropped together with everything after it, and the
    /// second element of the returned pair is set. Proper segmentation
    /// across multiple packets is not performed.
    pub fn encode(&self, max_size: usize) -> (BytesMut, bool) {
        TLS_BUF.with(|buf| {
            let mut buf = buf.borrow_mut();
            buf.clear();

            // Encode packet header. The length field is rewritten below.
            buf.put_u16(0);
            buf.put_u16(self.seqno);

            let mut truncated = false;
            for msg in &self.messages {
                let mark = buf.len();
                msg.encode(&mut buf);
                if buf.len() > max_size {
                    buf.truncate(mark);
                    truncated = true;
                    break;
                }
            }

            // Rewrite the packet length.
            let pkt_len = buf.len() as u16;
            buf[0..2].copy_from_slice(&pkt_len.to_be_bytes());

            (buf.clone(), truncated)
        })
    }

    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut buf = Bytes::copy_from_slice(data);

        if buf.remaining() < Self::HDR_LENGTH {
            return Err(DecodeError::Truncated);
        }

        // Parse and validate the packet header.
        let pkt_len = buf.get_u16();
        let seqno = buf.get_u16();
        if (pkt_len as usize) < Self::HDR_LENGTH {
            return Err(DecodeError::BadPacketLength(pkt_len));
        }
        if (pkt_len as usize) > data.len() {
            return Err(DecodeError::Truncated);
        }
        buf.truncate(pkt_len as usize - Self::HDR_LENGTH);

        // Parse the contained messages. A message whose framing is intact
        // but whose body fails to parse is recorded and skipped; broken
        // framing discards the rest of the packet.
        let mut messages = vec![];
        let mut msg_errors = vec![];
        while buf.remaining() >= MessageHdr::LENGTH {
            match Message::decode(&mut buf) {
                Ok(msg) => messages.push(msg),
                Err(MessageError::Framing(error)) => return Err(error),
                Err(MessageError::Body(error)) => msg_errors.push(error),
            }
        }

        Ok(Packet {
            seqno,
            messages,
            msg_errors,
        })
    }

    /// Patches the packet sequence number into an already encoded packet.
    ///
    /// Flooding encodes a packet once and then stamps the per-interface
    /// sequence number immediately before each transmission.
    pub fn update_encoded_seqno(data: &mut BytesMut, seqno: u16) {
        data[2..4].copy_from_slice(&seqno.to_be_bytes());
    }
}

// Distinguishes recoverable body errors from framing errors that poison the
// rest of the packet.
enum MessageError {
    Framing(DecodeError),
    Body(DecodeError),
}

// ===== impl Message =====

impl Message {
    pub const TYPE_HELLO: u8 = 1;
    pub const TYPE_TC: u8 = 2;
    pub const TYPE_MID: u8 = 3;
    pub const TYPE_HNA: u8 = 4;

    pub fn msg_type(&self) -> u8 {
        match &self.body {
            MessageBody::Hello(_) => Self::TYPE_HELLO,
            MessageBody::Tc(_) => Self::TYPE_TC,
            MessageBody::Mid(_) => Self::TYPE_MID,
            MessageBody::Hna(_) => Self::TYPE_HNA,
            MessageBody::Unknown(unknown) => unknown.msg_type,
        }
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        let mark = buf.len();

        // Encode message header. The size field is rewritten below.
        buf.put_u8(self.msg_type());
        buf.put_u8(self.hdr.vtime);
        buf.put_u16(0);
        buf.put_ipv4(&self.hdr.origin);
        buf.put_u8(self.hdr.ttl);
        buf.put_u8(self.hdr.hop_count);
        buf.put_u16(self.hdr.seqno);

        // Encode message body.
        match &self.body {
            MessageBody::Hello(hello) => hello.encode(buf),
            MessageBody::Tc(tc) => tc.encode(buf),
            MessageBody::Mid(mid) => mid.encode(buf),
            MessageBody::Hna(hna) => hna.encode(buf),
            MessageBody::Unknown(unknown) => buf.put_slice(&unknown.data),
        }

        // Rewrite the message size.
        let msg_size = (buf.len() - mark) as u16;
        buf[mark + 2..mark + 4].copy_from_slice(&msg_size.to_be_bytes());
    }

    fn decode(buf: &mut Bytes) -> Result<Self, MessageError> {
        // Parse message header.
        let msg_type = buf.get_u8();
        let vtime = buf.get_u8();
        let msg_size = buf.get_u16();
        let origin = buf.get_ipv4();
        let ttl = buf.get_u8();
        let hop_count = buf.get_u8();
        let seqno = buf.get_u16();

        // Validate message framing.
        let msg_size = msg_size as usize;
        if msg_size < MessageHdr::LENGTH {
            return Err(MessageError::Framing(DecodeError::BadMessageLength(
                msg_size as u16,
            )));
        }
        let body_size = msg_size - MessageHdr::LENGTH;
        if body_size > buf.remaining() {
            return Err(MessageError::Framing(DecodeError::Truncated));
        }
        let mut body_buf = buf.slice(..body_size);
        buf.advance(body_size);

        // Parse message body.
        let body = match msg_type {
            0 => return Err(MessageError::Body(DecodeError::BadMessageType(0))),
            Self::TYPE_HELLO => HelloMessage::decode(&mut body_buf)
                .map(MessageBody::Hello)
                .map_err(MessageError::Body)?,
            Self::TYPE_TC => TcMessage::decode(&mut body_buf)
                .map(MessageBody::Tc)
                .map_err(MessageError::Body)?,
            Self::TYPE_MID => MidMessage::decode(&mut body_buf)
                .map(MessageBody::Mid)
                .map_err(MessageError::Body)?,
            Self::TYPE_HNA => HnaMessage::decode(&mut body_buf)
                .map(MessageBody::Hna)
                .map_err(MessageError::Body)?,
            _ => MessageBody::Unknown(UnknownMessage {
                msg_type,
                data: body_buf,
            }),
        };

        let hdr = MessageHdr {
            vtime,
            origin,
            ttl,
            hop_count,
            seqno,
        };

        Ok(Message { hdr, body })
    }
}

// ===== impl MessageHdr =====

impl MessageHdr {
    pub const LENGTH: usize = 12;
}

// ===== impl HelloMessage =====

impl HelloMessage {
    const HDR_LENGTH: usize = 4;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        // Reserved field.
        buf.put_u16(0);
        buf.put_u8(self.htime);
        buf.put_u8(self.willingness.get());

        for link in &self.links {
            link.encode(buf);
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::HDR_LENGTH {
            return Err(DecodeError::Truncated);
        }

        // Reserved field.
        let _ = buf.get_u16();
        let htime = buf.get_u8();
        let willingness = Willingness::new(buf.get_u8());

        let mut links = vec![];
        while buf.remaining() >= LinkMessage::HDR_LENGTH {
            links.push(LinkMessage::decode(buf)?);
        }
        if buf.has_remaining() {
            return Err(DecodeError::Truncated);
        }

        Ok(HelloMessage {
            htime,
            willingness,
            links,
        })
    }
}

// ===== impl LinkMessage =====

impl LinkMessage {
    const HDR_LENGTH: usize = 4;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.code.encode());
        // Reserved field.
        buf.put_u8(0);
        buf.put_u16(
            (Self::HDR_LENGTH + self.addrs.len() * 4) as u16,
        );
        for addr in &self.addrs {
            buf.put_ipv4(addr);
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        let code = LinkCode::decode(buf.get_u8())?;
        // Reserved field.
        let _ = buf.get_u8();
        let size = buf.get_u16() as usize;

        if size < Self::HDR_LENGTH || (size - Self::HDR_LENGTH) % 4 != 0 {
            return Err(DecodeError::BadMessageLength(size as u16));
        }
        let addr_len = size - Self::HDR_LENGTH;
        if addr_len > buf.remaining() {
            return Err(DecodeError::Truncated);
        }

        let mut addrs = vec![];
        for _ in 0..addr_len / 4 {
            addrs.push(buf.get_ipv4());
        }

        Ok(LinkMessage { code, addrs })
    }
}

// ===== impl LinkCode =====

impl LinkCode {
    pub(crate) fn encode(&self) -> u8 {
        (self.neighbor_type as u8) << 2 | self.link_type as u8
    }

    pub(crate) fn decode(byte: u8) -> DecodeResult<Self> {
        // The upper four bits are reserved and must be zero; neighbor type
        // three is not assigned.
        if byte & 0xF0 != 0 {
            return Err(DecodeError::BadLinkCode(byte));
        }
        let link_type = LinkType::from_u8(byte & 0x03)
            .ok_or(DecodeError::BadLinkCode(byte))?;
        let neighbor_type = NeighborType::from_u8(byte >> 2)
            .ok_or(DecodeError::BadLinkCode(byte))?;

        Ok(LinkCode {
            link_type,
            neighbor_type,
        })
    }
}

// ===== impl TcMessage =====

impl TcMessage {
    const HDR_LENGTH: usize = 4;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ansn);
        // Reserved field.
        buf.put_u16(0);
        for addr in &self.neighbors {
            buf.put_ipv4(addr);
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::HDR_LENGTH
            || (buf.remaining() - Self::HDR_LENGTH) % 4 != 0
        {
            return Err(DecodeError::BadMessageLength(buf.remaining() as u16));
        }

        let ansn = buf.get_u16();
        // Reserved field.
        let _ = buf.get_u16();

        let mut neighbors = vec![];
        while buf.has_remaining() {
            neighbors.push(buf.get_ipv4());
        }

        Ok(TcMessage { ansn, neighbors })
    }
}

// ===== impl MidMessage =====

impl MidMessage {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for addr in &self.interfaces {
            buf.put_ipv4(addr);
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() % 4 != 0 {
            return Err(DecodeError::BadMessageLength(buf.remaining() as u16));
        }

        let mut interfaces = vec![];
        while buf.has_remaining() {
            interfaces.push(buf.get_ipv4());
        }

        Ok(MidMessage { interfaces })
    }
}

// ===== impl HnaMessage =====

impl HnaMessage {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for network in &self.networks {
            buf.put_ipv4(&network.network());
            buf.put_ipv4(&network.mask());
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() % 8 != 0 {
            return Err(DecodeError::BadMessageLength(buf.remaining() as u16));
        }

        let mut networks = vec![];
        while buf.has_remaining() {
            let addr = buf.get_ipv4();
            let mask = buf.get_ipv4();
            let network = Ipv4Network::with_netmask(addr, mask)
                .map_err(|_| DecodeError::InvalidPrefix(addr, mask))?;
            networks.push(network);
        }

        Ok(HnaMessage { networks })
    }
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated => {
                write!(f, "truncated packet")
            }
            DecodeError::BadPacketLength(length) => {
                write!(f, "invalid packet length: {length}")
            }
            DecodeError::BadMessageLength(length) => {
                write!(f, "invalid message length: {length}")
            }
            DecodeError::BadMessageType(msg_type) => {
                write!(f, "invalid message type: {msg_type}")
            }
            DecodeError::BadLinkCode(code) => {
                write!(f, "invalid link code: {code}")
            }
            DecodeError::InvalidPrefix(addr, mask) => {
                write!(f, "invalid network prefix: {addr} mask {mask}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
