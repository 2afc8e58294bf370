//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Packet envelope. The same layout is used for requests and replies.
//!
//! | offset | field |
//! |---|---|
//! | 0..8 | destination address block |
//! | 8..16 | source address block |
//! | 16 | sequence (u16) |
//! | 18 | protocol type (u16) |
//! | 20 | flags |
//! | 21 | protocol class (4 bytes) |
//! | 25 | method (u16) |
//! | 27.. | payload |

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::address::{Address, Endpoint, MacAddr};
use crate::constants::{
    Method, CREDENTIALS_LEN, DEFAULT_CREDENTIALS, HEADER_LEN, REQUEST_SEQUENCE, UAP_CLASS_UCP,
    UCP_FLAGS, UDAP_TYPE_UCP,
};
use crate::errors::{ProtoError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub destination: Endpoint,
    pub source: Endpoint,
    pub sequence: u16,
    pub protocol_type: u16,
    pub flags: u8,
    pub protocol_class: [u8; 4],
    pub method: Method,
    /// Method-specific body, without the credential block.
    pub payload: Bytes,
}

impl Packet {
    /// Request addressed to a single device by hardware address.
    pub fn request(method: Method, target: MacAddr) -> Self {
        Self {
            destination: Endpoint::new(false, Address::LinkLayer(target)),
            source: Endpoint::new(false, Address::unspecified_transport()),
            sequence: REQUEST_SEQUENCE,
            protocol_type: UDAP_TYPE_UCP,
            flags: UCP_FLAGS,
            protocol_class: UAP_CLASS_UCP,
            method,
            payload: Bytes::new(),
        }
    }

    /// Broadcast advertised-discover request.
    pub fn discover() -> Self {
        let mut packet = Self::request(Method::AdvDiscover, MacAddr::ZERO);
        packet.destination.broadcast = true;
        packet
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Bulk reads and writes are requests sent towards a device; only those
    /// arrive with a credential block in front of the body. Replies do not.
    fn is_bulk_request(&self) -> bool {
        self.method.carries_credentials()
            && matches!(self.destination.address, Address::LinkLayer(_))
    }

    /// Parse a received datagram. The credential block is dropped from bulk
    /// requests when present; anything shorter is kept as the payload.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::MalformedPacket {
                len: buf.len(),
                min: HEADER_LEN,
            });
        }
        let mut cursor = buf;
        let destination = Endpoint::decode(&mut cursor)?;
        let source = Endpoint::decode(&mut cursor)?;
        let sequence = cursor.get_u16();
        let protocol_type = cursor.get_u16();
        let flags = cursor.get_u8();
        let mut protocol_class = [0u8; 4];
        cursor.copy_to_slice(&mut protocol_class);
        let method = Method::from(cursor.get_u16());

        let mut packet = Self {
            destination,
            source,
            sequence,
            protocol_type,
            flags,
            protocol_class,
            method,
            payload: Bytes::new(),
        };
        if packet.is_bulk_request() && cursor.len() >= CREDENTIALS_LEN {
            cursor.advance(CREDENTIALS_LEN);
        }
        packet.payload = Bytes::copy_from_slice(cursor);
        trace!(method = ?packet.method, payload_len = packet.payload.len(), "parsed packet");
        Ok(packet)
    }

    /// Serialise for sending. Protocol type and class are always written as
    /// the UCP constants; devices reject anything else.
    pub fn assemble(&self) -> Bytes {
        let credentials = if self.method.carries_credentials() {
            CREDENTIALS_LEN
        } else {
            0
        };
        let mut out = BytesMut::with_capacity(HEADER_LEN + credentials + self.payload.len());
        self.destination.encode(&mut out);
        self.source.encode(&mut out);
        out.put_u16(self.sequence);
        out.put_u16(UDAP_TYPE_UCP);
        out.put_u8(self.flags);
        out.put_slice(&UAP_CLASS_UCP);
        out.put_u16(self.method.code());
        if credentials > 0 {
            out.put_slice(&DEFAULT_CREDENTIALS);
        }
        out.put_slice(&self.payload);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddrV4};

    use super::*;

    fn device() -> MacAddr {
        MacAddr([0x00, 0x04, 0x20, 0x16, 0x05, 0x2b])
    }

    #[test]
    fn discover_request_layout() {
        let bytes = Packet::discover().assemble();
        assert_eq!(bytes.len(), 27);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(&bytes[2..8], &[0u8; 6]);
        assert_eq!(bytes[8], 0x00);
        assert_eq!(bytes[9], 0x02);
        assert_eq!(&bytes[18..20], &[0xC0, 0x01]);
        assert_eq!(bytes[20], 0x01);
        assert_eq!(&bytes[21..25], &[0x00, 0x01, 0x00, 0x01]);
        assert_eq!(&bytes[25..27], &[0x00, 0x09]);
    }

    #[test]
    fn bulk_requests_carry_credential_block() {
        let body = Bytes::from_static(&[0x00, 0x01, 0x00, 0x04, 0x00, 0x01]);
        let bytes = Packet::request(Method::GetData, device())
            .with_payload(body.clone())
            .assemble();
        assert_eq!(bytes.len(), 27 + 32 + body.len());
        assert!(bytes[27..59].iter().all(|b| *b == 0));
        assert_eq!(&bytes[59..], body.as_ref());

        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(parsed.method, Method::GetData);
        assert_eq!(parsed.payload, body);
    }

    #[test]
    fn other_requests_have_no_credentials() {
        let bytes = Packet::request(Method::GetIp, device()).assemble();
        assert_eq!(bytes.len(), 27);
    }

    #[test]
    fn round_trip_preserves_semantic_fields() {
        let packet = Packet {
            destination: Endpoint::new(false, Address::LinkLayer(device())),
            source: Endpoint::new(
                false,
                Address::Transport(SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 5), 40123)),
            ),
            sequence: 7,
            protocol_type: UDAP_TYPE_UCP,
            flags: 0x00,
            protocol_class: UAP_CLASS_UCP,
            method: Method::GetData,
            payload: Bytes::from_static(&[0x00, 0x00]),
        };
        assert_eq!(Packet::parse(&packet.assemble()).unwrap(), packet);
    }

    #[test]
    fn credential_block_follows_method_not_destination() {
        let mut packet = Packet::request(Method::SetData, device())
            .with_payload(Bytes::from_static(&[0x00, 0x1a]));
        packet.destination = Endpoint::new(
            false,
            Address::Transport(SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 5), 40123)),
        );
        let bytes = packet.assemble();
        assert_eq!(bytes.len(), 27 + 32 + 2);
        assert!(bytes[27..59].iter().all(|b| *b == 0));
    }

    #[test]
    fn device_reply_payload_is_not_stripped() {
        let mut reply = Packet::request(Method::GetIp, device());
        std::mem::swap(&mut reply.destination, &mut reply.source);
        let mut bytes = reply
            .with_payload(Bytes::from_static(&[0x00, 0x1a]))
            .assemble()
            .to_vec();
        bytes[26] = Method::SetData.code() as u8;
        assert_eq!(bytes.len(), 29);
        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(parsed.method, Method::SetData);
        assert_eq!(parsed.payload.as_ref(), &[0x00, 0x1a]);
    }

    #[test]
    fn short_bulk_request_keeps_payload() {
        let mut bytes = Packet::request(Method::GetIp, device()).assemble().to_vec();
        bytes[26] = Method::GetData.code() as u8;
        bytes.extend_from_slice(&[0xAA; 10]);
        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(parsed.method, Method::GetData);
        assert_eq!(parsed.payload.as_ref(), &[0xAA; 10]);
    }

    #[test]
    fn short_buffers_are_malformed() {
        let bytes = Packet::discover().assemble();
        assert_eq!(
            Packet::parse(&bytes[..26]),
            Err(ProtoError::MalformedPacket { len: 26, min: 27 })
        );
    }

    #[test]
    fn unknown_address_type_fails_parse() {
        let mut bytes = Packet::discover().assemble().to_vec();
        bytes[9] = 0x03;
        assert_eq!(
            Packet::parse(&bytes),
            Err(ProtoError::UnknownAddressType { tag: 3 })
        );
    }
}
