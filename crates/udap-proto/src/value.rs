//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Typed configuration values and their fixed-width wire form.

use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::errors::{ProtoError, Result};

/// Semantic type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Bool,
    Uint8,
    #[strum(serialize = "ipv4")]
    IPv4,
    Text,
    Bytes,
}

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    Uint8(u8),
    IPv4(Ipv4Addr),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::Bool(_) => SemanticType::Bool,
            Value::Uint8(_) => SemanticType::Uint8,
            Value::IPv4(_) => SemanticType::IPv4,
            Value::Text(_) => SemanticType::Text,
            Value::Bytes(_) => SemanticType::Bytes,
        }
    }

    /// Zero value a field holds before the device has been read.
    pub fn default_for(ty: SemanticType) -> Self {
        match ty {
            SemanticType::Bool => Value::Bool(false),
            SemanticType::Uint8 => Value::Uint8(0),
            SemanticType::IPv4 => Value::IPv4(Ipv4Addr::UNSPECIFIED),
            SemanticType::Text => Value::Text(String::new()),
            SemanticType::Bytes => Value::Bytes(Vec::new()),
        }
    }

    /// Parse operator input as a value of the given type.
    pub fn parse(ty: SemanticType, input: &str) -> Result<Self> {
        let invalid = || ProtoError::InvalidValue {
            input: input.to_owned(),
            expected: ty,
        };
        let trimmed = input.trim();
        match ty {
            SemanticType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            SemanticType::Uint8 => trimmed.parse().map(Value::Uint8).map_err(|_| invalid()),
            SemanticType::IPv4 => trimmed.parse().map(Value::IPv4).map_err(|_| invalid()),
            SemanticType::Text => Ok(Value::Text(input.to_owned())),
            SemanticType::Bytes => Ok(Value::Bytes(trimmed.as_bytes().to_vec())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::IPv4(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => match std::str::from_utf8(v) {
                Ok(text) if text.chars().all(|c| c.is_ascii_graphic()) => f.write_str(text),
                _ => f.write_str(&hex::encode(v)),
            },
        }
    }
}

/// Encode a value into exactly `wire_length` bytes, zero padding short
/// encodings and truncating long ones.
pub fn pack(value: &Value, wire_length: u16) -> Bytes {
    let wire_length = usize::from(wire_length);
    let mut out = BytesMut::with_capacity(wire_length);
    match value {
        Value::Bool(v) => out.put_u8(u8::from(*v)),
        Value::Uint8(v) => out.put_u8(*v),
        Value::IPv4(v) => out.put_slice(&v.octets()),
        Value::Text(v) => out.put_slice(v.as_bytes()),
        Value::Bytes(v) => out.put_slice(v),
    }
    if out.len() < wire_length {
        out.put_bytes(0, wire_length - out.len());
    } else {
        out.truncate(wire_length);
    }
    out.freeze()
}

/// Decode wire bytes as a value of the given type.
///
/// Text and key material lose their trailing zero padding. Text that is not
/// valid UTF-8 comes back as [`Value::Bytes`]. Returns `None` when the bytes
/// cannot hold a value of that type.
pub fn unpack(bytes: &[u8], ty: SemanticType) -> Option<Value> {
    match ty {
        SemanticType::Bool => bytes.first().map(|b| Value::Bool(*b == 0x01)),
        SemanticType::Uint8 => bytes.first().map(|b| Value::Uint8(*b)),
        SemanticType::IPv4 => {
            let octets: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
            Some(Value::IPv4(Ipv4Addr::from(octets)))
        }
        SemanticType::Text => {
            let raw = trim_padding(bytes);
            // Non-UTF-8 text is kept as raw bytes so it is written back unchanged.
            Some(match std::str::from_utf8(raw) {
                Ok(text) => Value::Text(text.to_owned()),
                Err(_) => Value::Bytes(raw.to_vec()),
            })
        }
        SemanticType::Bytes => Some(Value::Bytes(trim_padding(bytes).to_vec())),
    }
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}
