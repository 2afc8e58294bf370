//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use thiserror::Error;

use crate::value::SemanticType;

pub type Result<T> = std::result::Result<T, ProtoError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    #[error("packet of {len} bytes is shorter than the {min}-byte header")]
    MalformedPacket { len: usize, min: usize },
    #[error("unknown address type tag {tag}")]
    UnknownAddressType { tag: u8 },
    #[error("record truncated: needed {needed} bytes, {remaining} remaining")]
    TruncatedRecord { needed: usize, remaining: usize },
    #[error("no schema field at offset {offset}")]
    UnknownSchemaOffset { offset: u16 },
    #[error("value for field {field} at offset {offset} is unreadable as {expected}")]
    UnreadableFieldType {
        offset: u16,
        field: &'static str,
        expected: SemanticType,
    },
    #[error("unknown configuration field {0}")]
    UnknownField(String),
    #[error("field {field} holds {expected} values, got {found}")]
    TypeMismatch {
        field: &'static str,
        expected: SemanticType,
        found: SemanticType,
    },
    #[error("value {value} is out of range for field {field}")]
    ValueOutOfRange { field: &'static str, value: u8 },
    #[error("cannot parse {input:?} as {expected}")]
    InvalidValue {
        input: String,
        expected: SemanticType,
    },
    #[error("schema declares offset {0} more than once")]
    DuplicateOffset(u16),
}

impl ProtoError {
    /// Errors that abort decoding of the whole buffer, as opposed to a single skipped entry.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ProtoError::UnknownSchemaOffset { .. } | ProtoError::UnreadableFieldType { .. }
        )
    }
}
