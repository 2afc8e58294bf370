//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Source/destination address blocks.
//!
//! Every block is eight bytes: broadcast flag, address type tag and a six byte
//! body whose meaning depends on the tag.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::errors::{ProtoError, Result};

/// Encoded size of one address block.
pub const ADDRESS_BLOCK_LEN: usize = 8;

const ADDRESS_BODY_LEN: usize = 6;

/// Address type tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AddressTag {
    Raw = 0,
    LinkLayer = 1,
    Transport = 2,
    Reserved = 3,
}

/// Six byte hardware address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, SerializeDisplay, DeserializeFromStr,
)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0u8; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = String;

    /// Accepts `00:04:20:aa:bb:cc`, `00-04-20-AA-BB-CC` or bare `000420aabbcc`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        let mut octets = [0u8; 6];
        hex::decode_to_slice(&digits, &mut octets)
            .map_err(|err| format!("invalid MAC address {s:?}: {err}"))?;
        Ok(MacAddr(octets))
    }
}

/// Address carried in a block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Unaddressed,
    LinkLayer(MacAddr),
    Transport(SocketAddrV4),
}

impl Address {
    pub fn tag(&self) -> AddressTag {
        match self {
            Address::Unaddressed => AddressTag::Raw,
            Address::LinkLayer(_) => AddressTag::LinkLayer,
            Address::Transport(_) => AddressTag::Transport,
        }
    }

    pub fn mac(&self) -> Option<MacAddr> {
        match self {
            Address::LinkLayer(mac) => Some(*mac),
            _ => None,
        }
    }

    /// The unspecified UDP address used as the source of every request.
    pub fn unspecified_transport() -> Self {
        Address::Transport(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }
}

/// One side of a packet: broadcast flag plus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub broadcast: bool,
    pub address: Address,
}

impl Endpoint {
    pub fn new(broadcast: bool, address: Address) -> Self {
        Self { broadcast, address }
    }

    /// Decode one address block from the front of `buf`, advancing it by
    /// [`ADDRESS_BLOCK_LEN`] bytes.
    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        if buf.remaining() < ADDRESS_BLOCK_LEN {
            return Err(ProtoError::TruncatedRecord {
                needed: ADDRESS_BLOCK_LEN,
                remaining: buf.remaining(),
            });
        }
        let broadcast = buf.get_u8() == 0x01;
        let tag = buf.get_u8();
        let mut body = [0u8; ADDRESS_BODY_LEN];
        buf.copy_to_slice(&mut body);

        let address = match tag {
            t if t == AddressTag::LinkLayer as u8 => Address::LinkLayer(MacAddr(body)),
            t if t == AddressTag::Transport as u8 => {
                let ip = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
                let port = u16::from_be_bytes([body[4], body[5]]);
                Address::Transport(SocketAddrV4::new(ip, port))
            }
            // Raw and reserved tags are defined but never valid on the wire.
            other => return Err(ProtoError::UnknownAddressType { tag: other }),
        };
        Ok(Self { broadcast, address })
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u8(u8::from(self.broadcast));
        out.put_u8(self.address.tag() as u8);
        match self.address {
            Address::Unaddressed => out.put_bytes(0, ADDRESS_BODY_LEN),
            Address::LinkLayer(mac) => out.put_slice(&mac.0),
            Address::Transport(addr) => {
                out.put_slice(&addr.ip().octets());
                out.put_u16(addr.port());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_layer_block_layout() {
        let mac: MacAddr = "00:04:20:12:34:56".parse().unwrap();
        let mut out = Vec::new();
        Endpoint::new(true, Address::LinkLayer(mac)).encode(&mut out);
        assert_eq!(out, [0x01, 0x01, 0x00, 0x04, 0x20, 0x12, 0x34, 0x56]);

        let mut cursor = out.as_slice();
        let decoded = Endpoint::decode(&mut cursor).unwrap();
        assert!(decoded.broadcast);
        assert_eq!(decoded.address.mac(), Some(mac));
        assert!(cursor.is_empty());
    }

    #[test]
    fn transport_block_carries_big_endian_port() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 17784);
        let mut out = Vec::new();
        Endpoint::new(false, Address::Transport(addr)).encode(&mut out);
        assert_eq!(out, [0x00, 0x02, 192, 168, 1, 20, 0x45, 0x78]);

        let decoded = Endpoint::decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded.address, Address::Transport(addr));
    }

    #[test]
    fn raw_and_reserved_tags_are_rejected() {
        let mut out = Vec::new();
        Endpoint::new(false, Address::Unaddressed).encode(&mut out);
        assert_eq!(out, [0u8; 8]);
        assert_eq!(
            Endpoint::decode(&mut out.as_slice()),
            Err(ProtoError::UnknownAddressType { tag: 0 })
        );

        let reserved = [0u8, 3, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            Endpoint::decode(&mut reserved.as_slice()),
            Err(ProtoError::UnknownAddressType { tag: 3 })
        );
    }

    #[test]
    fn mac_parsing_accepts_common_separators() {
        let expected = MacAddr([0x00, 0x04, 0x20, 0xaa, 0xbb, 0xcc]);
        assert_eq!("00-04-20-AA-BB-CC".parse::<MacAddr>().unwrap(), expected);
        assert_eq!("000420aabbcc".parse::<MacAddr>().unwrap(), expected);
        assert_eq!(expected.to_string(), "00:04:20:aa:bb:cc");
        assert!("00:04:20".parse::<MacAddr>().is_err());
    }
}
