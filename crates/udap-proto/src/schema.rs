//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Offset-indexed table of every configuration attribute a device exposes.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::errors::{ProtoError, Result};
use crate::value::{SemanticType, Value};

/// Whether operators may change a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Accepted range for small integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Limit {
    Any,
    Max(u8),
    OneOf(&'static [u8]),
}

impl Limit {
    pub fn allows(&self, value: u8) -> bool {
        match self {
            Limit::Any => true,
            Limit::Max(max) => value <= *max,
            Limit::OneOf(set) => set.contains(&value),
        }
    }
}

/// One configuration attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub offset: u16,
    pub name: &'static str,
    pub wire_length: u16,
    pub semantic_type: SemanticType,
    pub access: Access,
    pub limit: Limit,
    pub description: &'static str,
}

impl SchemaField {
    pub const fn new(
        offset: u16,
        name: &'static str,
        wire_length: u16,
        semantic_type: SemanticType,
    ) -> Self {
        Self {
            offset,
            name,
            wire_length,
            semantic_type,
            access: Access::ReadWrite,
            limit: Limit::Any,
            description: "",
        }
    }

    const fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    const fn limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Check that `value` fits this field's type and limit.
    pub fn check(&self, value: &Value) -> Result<()> {
        if value.semantic_type() != self.semantic_type {
            return Err(ProtoError::TypeMismatch {
                field: self.name,
                expected: self.semantic_type,
                found: value.semantic_type(),
            });
        }
        if let Value::Uint8(v) = value {
            if !self.limit.allows(*v) {
                return Err(ProtoError::ValueOutOfRange {
                    field: self.name,
                    value: *v,
                });
            }
        }
        Ok(())
    }
}

const WIRELESS_REGIONS: &[u8] = &[4, 6, 7, 13, 14, 16, 21, 23];

const SQUEEZEBOX_FIELDS: &[SchemaField] = &[
    SchemaField::new(4, "lanIPMode", 1, SemanticType::Bool)
        .describe("false = static IP, true = DHCP"),
    SchemaField::new(5, "lanNetworkAddress", 4, SemanticType::IPv4)
        .describe("Static IP address"),
    SchemaField::new(9, "lanSubnetMask", 4, SemanticType::IPv4).describe("Static subnet mask"),
    SchemaField::new(13, "lanGateway", 4, SemanticType::IPv4)
        .describe("Static gateway address"),
    SchemaField::new(17, "hostname", 33, SemanticType::Text).describe("Device hostname"),
    SchemaField::new(50, "bridging", 1, SemanticType::Bool)
        .describe("true = use device as wireless bridge"),
    SchemaField::new(52, "interface", 1, SemanticType::Uint8)
        .limit(Limit::Max(1))
        .describe("0 = wireless link, 1 = wired link"),
    SchemaField::new(59, "primaryDNS", 4, SemanticType::IPv4)
        .describe("Static primary DNS address"),
    SchemaField::new(67, "secondaryDNS", 4, SemanticType::IPv4)
        .describe("Static secondary DNS address"),
    SchemaField::new(71, "activeServerAddress", 4, SemanticType::IPv4)
        .read_only()
        .describe("IP address of the currently active server"),
    SchemaField::new(79, "squeezeCenterAddress", 4, SemanticType::IPv4)
        .describe("IP address of the local SqueezeCenter server"),
    SchemaField::new(83, "squeezeCenterName", 33, SemanticType::Text)
        .read_only()
        .describe("Name of the local SqueezeCenter server"),
    SchemaField::new(173, "wirelessMode", 1, SemanticType::Uint8)
        .limit(Limit::Max(1))
        .describe("0 = infrastructure, 1 = ad hoc"),
    SchemaField::new(183, "wirelessSSID", 33, SemanticType::Text)
        .describe("SSID of the WiFi access point"),
    SchemaField::new(216, "wirelessChannel", 1, SemanticType::Uint8)
        .describe("WiFi channel, 0 for automatic"),
    SchemaField::new(218, "wirelessRegion", 1, SemanticType::Uint8)
        .limit(Limit::OneOf(WIRELESS_REGIONS))
        .describe("4 US, 6 CA, 7 AU, 13 FR, 14 EU, 16 JP, 21 TW, 23 CH"),
    SchemaField::new(220, "wirelessKeylen", 1, SemanticType::Uint8)
        .limit(Limit::Max(1))
        .describe("Wireless key length (0 = 64-bit, 1 = 128-bit)"),
    SchemaField::new(222, "wirelessWEPKey0", 13, SemanticType::Bytes)
        .describe("WEP key 0 in hex"),
    SchemaField::new(235, "wirelessWEPKey1", 13, SemanticType::Bytes)
        .describe("WEP key 1 in hex"),
    SchemaField::new(248, "wirelessWEPKey2", 13, SemanticType::Bytes)
        .describe("WEP key 2 in hex"),
    SchemaField::new(261, "wirelessWEPKey3", 13, SemanticType::Bytes)
        .describe("WEP key 3 in hex"),
    SchemaField::new(274, "wirelessWEPOn", 1, SemanticType::Bool)
        .describe("false = WEP off, true = WEP on"),
    SchemaField::new(275, "wirelessWPACipher", 1, SemanticType::Uint8)
        .limit(Limit::Max(3))
        .describe("1 = TKIP, 2 = AES, 3 = TKIP & AES"),
    SchemaField::new(276, "wirelessWPAMode", 1, SemanticType::Uint8)
        .limit(Limit::Max(2))
        .describe("1 = WPA, 2 = WPA2"),
    SchemaField::new(277, "wirelessWPAOn", 1, SemanticType::Bool)
        .describe("false = WPA off, true = WPA on"),
    SchemaField::new(278, "wirelessWPAPSK", 64, SemanticType::Text)
        .describe("WPA pre-shared key"),
];

static DEVICE_SCHEMA: Lazy<DeviceSchema> = Lazy::new(|| DeviceSchema {
    fields: SQUEEZEBOX_FIELDS.to_vec(),
    by_offset: index_offsets(SQUEEZEBOX_FIELDS),
});

fn index_offsets(fields: &[SchemaField]) -> BTreeMap<u16, usize> {
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| (field.offset, idx))
        .collect()
}

/// Immutable offset → field table.
#[derive(Debug, Clone)]
pub struct DeviceSchema {
    fields: Vec<SchemaField>,
    by_offset: BTreeMap<u16, usize>,
}

impl DeviceSchema {
    /// Build a schema, rejecting duplicate offsets.
    pub fn new(fields: Vec<SchemaField>) -> Result<Self> {
        let by_offset = index_offsets(&fields);
        if by_offset.len() != fields.len() {
            let mut seen = std::collections::BTreeSet::new();
            for field in &fields {
                if !seen.insert(field.offset) {
                    return Err(ProtoError::DuplicateOffset(field.offset));
                }
            }
        }
        Ok(Self { fields, by_offset })
    }

    /// Process-wide schema for SqueezeBox receivers.
    pub fn global() -> &'static DeviceSchema {
        &DEVICE_SCHEMA
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn by_offset(&self, offset: u16) -> Option<&SchemaField> {
        self.by_offset.get(&offset).map(|idx| &self.fields[*idx])
    }

    /// Field lookup by name, ignoring ASCII case.
    pub fn by_name(&self, name: &str) -> Option<&SchemaField> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_schema_offsets_are_unique() {
        let schema = DeviceSchema::global();
        assert_eq!(schema.len(), SQUEEZEBOX_FIELDS.len());
        assert!(DeviceSchema::new(SQUEEZEBOX_FIELDS.to_vec()).is_ok());
    }

    #[test]
    fn lookups_by_offset_and_name_agree() {
        let schema = DeviceSchema::global();
        let by_offset = schema.by_offset(4).unwrap();
        assert_eq!(by_offset.name, "lanIPMode");
        assert_eq!(schema.by_name("LANIPMODE"), Some(by_offset));
        assert_eq!(schema.by_offset(278).unwrap().wire_length, 64);
        assert!(schema.by_offset(5000).is_none());
        assert!(schema.by_name("colour").is_none());
    }

    #[test]
    fn wire_lengths_are_from_the_known_set() {
        for field in DeviceSchema::global().fields() {
            assert!(
                [1, 4, 13, 33, 64].contains(&field.wire_length),
                "{} has width {}",
                field.name,
                field.wire_length
            );
        }
    }

    #[test]
    fn duplicate_offsets_are_rejected() {
        let fields = vec![
            SchemaField::new(4, "a", 1, SemanticType::Bool),
            SchemaField::new(4, "b", 1, SemanticType::Uint8),
        ];
        assert_eq!(
            DeviceSchema::new(fields).unwrap_err(),
            ProtoError::DuplicateOffset(4)
        );
    }

    #[test]
    fn check_enforces_type_and_limit() {
        let schema = DeviceSchema::global();
        let region = schema.by_name("wirelessRegion").unwrap();
        assert!(region.check(&Value::Uint8(14)).is_ok());
        assert_eq!(
            region.check(&Value::Uint8(5)),
            Err(ProtoError::ValueOutOfRange {
                field: "wirelessRegion",
                value: 5
            })
        );
        assert!(matches!(
            region.check(&Value::Bool(true)),
            Err(ProtoError::TypeMismatch { .. })
        ));
        assert!(!schema.by_name("squeezeCenterName").unwrap().is_writable());
    }
}
