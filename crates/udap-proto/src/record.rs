//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Offset-indexed payloads for bulk configuration reads and writes.
//!
//! Requests and replies start with a big-endian entry count followed by
//! `{offset: u16, length: u16}` pairs. Save requests and read replies append
//! `length` value bytes to every pair.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::device::DeviceRecord;
use crate::errors::{ProtoError, Result};
use crate::schema::{DeviceSchema, SchemaField};
use crate::value::{self, Value};

const ENTRY_HEADER_LEN: usize = 4;

/// Most entries one payload can describe; the count field is a `u16`.
const MAX_ENTRIES: usize = u16::MAX as usize;

/// One decoded configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub offset: u16,
    pub name: &'static str,
    pub value: Value,
}

/// Result of decoding a read reply: the values that mapped onto the schema
/// and the entries that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRecord {
    pub entries: Vec<DataEntry>,
    pub skipped: Vec<ProtoError>,
}

impl DataRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| &entry.value)
    }
}

/// Encoded save request together with the number of fields it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub payload: Bytes,
    pub count: u16,
}

/// Translates between schema fields and data-record payloads.
#[derive(Debug, Clone, Copy)]
pub struct DataRecordCodec<'s> {
    schema: &'s DeviceSchema,
}

impl Default for DataRecordCodec<'static> {
    fn default() -> Self {
        Self::new(DeviceSchema::global())
    }
}

impl<'s> DataRecordCodec<'s> {
    pub fn new(schema: &'s DeviceSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s DeviceSchema {
        self.schema
    }

    /// Ask for every field in the schema.
    pub fn retrieve_request(&self) -> Bytes {
        Self::retrieve_request_for(self.schema.fields())
    }

    /// Ask for a caller-chosen subset of fields.
    pub fn retrieve_request_for<'f>(fields: impl IntoIterator<Item = &'f SchemaField>) -> Bytes {
        let fields: Vec<&SchemaField> = fields.into_iter().take(MAX_ENTRIES).collect();
        let count = u16::try_from(fields.len()).unwrap_or(u16::MAX);
        let mut out = BytesMut::with_capacity(2 + fields.len() * ENTRY_HEADER_LEN);
        out.put_u16(count);
        for field in fields {
            out.put_u16(field.offset);
            out.put_u16(field.wire_length);
        }
        out.freeze()
    }

    /// Write every schema field from the record's current snapshot.
    pub fn save_request(&self, record: &DeviceRecord) -> SaveRequest {
        Self::save_request_for(record, self.schema.fields())
    }

    /// Write a subset of fields. Fields the record has no value for are sent
    /// as their zero value.
    pub fn save_request_for<'f>(
        record: &DeviceRecord,
        fields: impl IntoIterator<Item = &'f SchemaField>,
    ) -> SaveRequest {
        let mut body = BytesMut::new();
        let mut count: u16 = 0;
        for field in fields.into_iter().take(MAX_ENTRIES) {
            let fallback;
            let current = match record.get(field.name) {
                Some(value) => value,
                None => {
                    fallback = Value::default_for(field.semantic_type);
                    &fallback
                }
            };
            body.put_u16(field.offset);
            body.put_u16(field.wire_length);
            body.put(value::pack(current, field.wire_length));
            count += 1;
        }
        let mut out = BytesMut::with_capacity(2 + body.len());
        out.put_u16(count);
        out.put(body);
        SaveRequest {
            payload: out.freeze(),
            count,
        }
    }

    /// Decode a read reply. Entries whose offset is not in the schema or whose
    /// bytes cannot be read as the field's type are logged and skipped.
    pub fn decode(&self, payload: &[u8]) -> Result<DataRecord> {
        let mut buf = payload;
        if buf.remaining() < 2 {
            return Err(ProtoError::TruncatedRecord {
                needed: 2,
                remaining: buf.remaining(),
            });
        }
        let count = buf.get_u16();
        let mut record = DataRecord::default();

        for _ in 0..count {
            if buf.remaining() < ENTRY_HEADER_LEN {
                return Err(ProtoError::TruncatedRecord {
                    needed: ENTRY_HEADER_LEN,
                    remaining: buf.remaining(),
                });
            }
            let offset = buf.get_u16();
            let length = usize::from(buf.get_u16());
            if buf.remaining() < length {
                return Err(ProtoError::TruncatedRecord {
                    needed: length,
                    remaining: buf.remaining(),
                });
            }
            let (raw, rest) = buf.split_at(length);
            buf = rest;

            let Some(field) = self.schema.by_offset(offset) else {
                warn!(offset, length, "skipping data entry with unknown offset");
                record
                    .skipped
                    .push(ProtoError::UnknownSchemaOffset { offset });
                continue;
            };
            match value::unpack(raw, field.semantic_type) {
                Some(value) => record.entries.push(DataEntry {
                    offset,
                    name: field.name,
                    value,
                }),
                None => {
                    warn!(offset, field = field.name, length, "skipping unreadable data entry");
                    record.skipped.push(ProtoError::UnreadableFieldType {
                        offset,
                        field: field.name,
                        expected: field.semantic_type,
                    });
                }
            }
        }
        Ok(record)
    }
}

/// Number of fields the device reports as changed in a save reply.
pub fn decode_save_ack(payload: &[u8]) -> Result<u16> {
    let mut buf = payload;
    if buf.remaining() < 2 {
        return Err(ProtoError::TruncatedRecord {
            needed: 2,
            remaining: buf.remaining(),
        });
    }
    Ok(buf.get_u16())
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::address::MacAddr;
    use crate::value::SemanticType;

    fn record() -> DeviceRecord {
        DeviceRecord::new(MacAddr([0, 4, 0x20, 1, 2, 3]))
    }

    #[test]
    fn entry_count_is_capped_at_u16_max() {
        let field = SchemaField::new(4, "lanIPMode", 1, SemanticType::Bool);
        let many = vec![field; MAX_ENTRIES + 10];

        let request = DataRecordCodec::retrieve_request_for(&many);
        assert_eq!(&request[..2], &[0xFF, 0xFF]);
        assert_eq!(request.len(), 2 + MAX_ENTRIES * ENTRY_HEADER_LEN);

        let save = DataRecordCodec::save_request_for(&record(), &many);
        assert_eq!(save.count, u16::MAX);
        assert_eq!(&save.payload[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn retrieve_request_lists_offsets_and_lengths() {
        let schema = DeviceSchema::new(vec![
            SchemaField::new(4, "lanIPMode", 1, SemanticType::Bool),
            SchemaField::new(17, "hostname", 33, SemanticType::Text),
        ])
        .unwrap();
        let payload = DataRecordCodec::new(&schema).retrieve_request();
        assert_eq!(payload.as_ref(), [0, 2, 0, 4, 0, 1, 0, 17, 0, 33]);
    }

    #[test]
    fn full_retrieve_request_covers_schema() {
        let codec = DataRecordCodec::default();
        let payload = codec.retrieve_request();
        let fields = codec.schema().len();
        assert_eq!(payload.len(), 2 + fields * 4);
        assert_eq!(u16::from_be_bytes([payload[0], payload[1]]) as usize, fields);
    }

    #[test]
    fn decode_single_bool_entry() {
        let payload = [0x00, 0x01, 0x00, 0x04, 0x00, 0x01, 0x01];
        let decoded = DataRecordCodec::default().decode(&payload).unwrap();
        assert_eq!(decoded.get("lanIPMode"), Some(&Value::Bool(true)));
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn unknown_offsets_are_skipped_not_fatal() {
        let payload = [
            0x00, 0x02, // count
            0x00, 0x02, 0x00, 0x02, 0xAA, 0xBB, // offset 2 is not in the schema
            0x00, 0x34, 0x00, 0x01, 0x01, // interface = 1
        ];
        let decoded = DataRecordCodec::default().decode(&payload).unwrap();
        assert_eq!(decoded.skipped, vec![ProtoError::UnknownSchemaOffset { offset: 2 }]);
        assert_eq!(decoded.get("interface"), Some(&Value::Uint8(1)));
    }

    #[test]
    fn unreadable_values_are_skipped() {
        let payload = [0x00, 0x01, 0x00, 0x05, 0x00, 0x02, 10, 0];
        let decoded = DataRecordCodec::default().decode(&payload).unwrap();
        assert!(decoded.entries.is_empty());
        assert!(matches!(
            decoded.skipped.as_slice(),
            [ProtoError::UnreadableFieldType { offset: 5, .. }]
        ));
    }

    #[test]
    fn truncated_entries_fail() {
        let short_value = [0x00, 0x01, 0x00, 0x11, 0x00, 0x21, b'a'];
        assert_eq!(
            DataRecordCodec::default().decode(&short_value),
            Err(ProtoError::TruncatedRecord {
                needed: 33,
                remaining: 1
            })
        );
        let missing_entry = [0x00, 0x02, 0x00, 0x04, 0x00, 0x01, 0x01];
        assert!(matches!(
            DataRecordCodec::default().decode(&missing_entry),
            Err(ProtoError::TruncatedRecord { needed: 4, .. })
        ));
        assert!(DataRecordCodec::default().decode(&[0x00]).is_err());
    }

    #[test]
    fn save_request_round_trips_through_decode() {
        let mut device = record();
        device.set_field("lanIPMode", Value::Bool(true)).unwrap();
        device
            .set_field("lanGateway", Value::IPv4(Ipv4Addr::new(192, 168, 1, 1)))
            .unwrap();
        device.set_field("hostname", Value::Text("kitchen".into())).unwrap();
        device.set_field("wirelessRegion", Value::Uint8(14)).unwrap();
        device
            .set_field("wirelessWEPKey2", Value::Bytes(b"0badc0ffee".to_vec()))
            .unwrap();
        device
            .set_field("wirelessWPAPSK", Value::Text("p".repeat(64)))
            .unwrap();

        let codec = DataRecordCodec::default();
        let request = codec.save_request(&device);
        assert_eq!(usize::from(request.count), codec.schema().len());

        let decoded = codec.decode(&request.payload).unwrap();
        assert!(decoded.skipped.is_empty());
        let mut copy = record();
        copy.apply_data_record(&decoded);
        assert_eq!(copy.config().collect::<Vec<_>>(), device.config().collect::<Vec<_>>());
    }

    #[test]
    fn save_ack_reads_changed_count() {
        assert_eq!(decode_save_ack(&[0x00, 0x1a]), Ok(26));
        assert!(decode_save_ack(&[]).is_err());
    }
}
