//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Wire codec for the UDAP/UCP device configuration protocol.
//!
//! A controller broadcasts an advertised-discover [`Packet`], decodes each
//! reply's [`FieldList`] into a [`DeviceRecord`], then reads and writes the
//! device's configuration table through [`DataRecordCodec`] payloads. All
//! operations here are pure transforms over byte buffers; sending and
//! receiving datagrams lives in `udap-net`.

pub mod address;
pub mod constants;
pub mod device;
pub mod errors;
pub mod fields;
pub mod packet;
pub mod record;
pub mod schema;
pub mod value;

pub use address::{Address, AddressTag, Endpoint, MacAddr};
pub use constants::{Method, UDAP_PORT};
pub use device::DeviceRecord;
pub use errors::{ProtoError, Result};
pub use fields::FieldList;
pub use packet::Packet;
pub use record::{decode_save_ack, DataEntry, DataRecord, DataRecordCodec, SaveRequest};
pub use schema::{Access, DeviceSchema, Limit, SchemaField};
pub use value::{pack, unpack, SemanticType, Value};
