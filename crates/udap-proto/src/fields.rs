//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Tag-length-value payloads used by discovery and read-IP replies.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::errors::{ProtoError, Result};

/// Raw reply values keyed by UCP response code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    entries: BTreeMap<u8, Bytes>,
}

impl FieldList {
    /// Decode `{code: u8, length: u8, value}` records until a zero length
    /// terminator or the end of the buffer. A trailing fragment too short to
    /// hold a record header is ignored; a length that overruns the buffer is
    /// an error. Repeated codes keep the last value.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut rest = payload;
        while rest.len() >= 2 {
            let code = rest[0];
            let length = usize::from(rest[1]);
            if length == 0 {
                break;
            }
            let body = &rest[2..];
            if body.len() < length {
                return Err(ProtoError::TruncatedRecord {
                    needed: length,
                    remaining: body.len(),
                });
            }
            entries.insert(code, Bytes::copy_from_slice(&body[..length]));
            rest = &body[length..];
        }
        Ok(Self { entries })
    }

    pub fn get(&self, code: u8) -> Option<&[u8]> {
        self.entries.get(&code).map(|value| value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.entries.iter().map(|(code, value)| (*code, value.as_ref()))
    }
}
