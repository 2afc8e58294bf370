//! ---
//! udap_section: "02-protocol-codec"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDAP/UCP wire codec and device configuration schema."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Per-device snapshot of identity attributes and configuration values.

use std::net::Ipv4Addr;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::address::MacAddr;
use crate::constants::ucp_code;
use crate::errors::{ProtoError, Result};
use crate::fields::FieldList;
use crate::record::DataRecord;
use crate::schema::DeviceSchema;
use crate::value::Value;

/// Identity and configuration snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub mac: MacAddr,
    pub id: u16,
    pub name: String,
    pub device_type: String,
    pub status: String,
    pub firmware_rev: u16,
    pub hardware_rev: u32,
    pub ip_addr: Option<Ipv4Addr>,
    pub subnet_mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub dhcp: Option<bool>,
    pub uuid: Option<String>,
    config: IndexMap<&'static str, Value>,
}

impl DeviceRecord {
    /// New record with every schema field at its zero value.
    pub fn new(mac: MacAddr) -> Self {
        let config = DeviceSchema::global()
            .fields()
            .iter()
            .map(|field| (field.name, Value::default_for(field.semantic_type)))
            .collect();
        Self {
            mac,
            id: 0,
            name: String::new(),
            device_type: String::new(),
            status: String::new(),
            firmware_rev: 0,
            hardware_rev: 0,
            ip_addr: None,
            subnet_mask: None,
            gateway: None,
            dhcp: None,
            uuid: None,
            config,
        }
    }

    /// Current value of a configuration field, matched ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.config
            .get(name)
            .or_else(|| {
                self.config
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
    }

    /// Configuration snapshot in schema order.
    pub fn config(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.config.iter().map(|(name, value)| (*name, value))
    }

    /// Change one configuration field, checking its name, type and limit.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let field = DeviceSchema::global()
            .by_name(name)
            .ok_or_else(|| ProtoError::UnknownField(name.to_owned()))?;
        field.check(&value)?;
        self.config.insert(field.name, value);
        Ok(())
    }

    /// Merge values decoded from a read reply.
    pub fn apply_data_record(&mut self, record: &DataRecord) {
        for entry in &record.entries {
            self.config.insert(entry.name, entry.value.clone());
        }
        debug!(mac = %self.mac, fields = record.entries.len(), "applied data record");
    }

    /// Copy identity attributes from a discovery or read-IP reply. Unknown
    /// codes are ignored.
    pub fn apply_field_list(&mut self, fields: &FieldList) {
        for (code, raw) in fields.iter() {
            match code {
                ucp_code::DEVICE_NAME => self.name = text(raw),
                ucp_code::DEVICE_TYPE => self.device_type = text(raw),
                ucp_code::DEVICE_STATUS => self.status = text(raw),
                ucp_code::USE_DHCP => self.dhcp = raw.first().map(|b| *b == 0x01),
                ucp_code::IP_ADDR => self.ip_addr = self.ipv4(code, raw).or(self.ip_addr),
                ucp_code::SUBNET_MASK => {
                    self.subnet_mask = self.ipv4(code, raw).or(self.subnet_mask)
                }
                ucp_code::GATEWAY_ADDR => self.gateway = self.ipv4(code, raw).or(self.gateway),
                ucp_code::FIRMWARE_REV => match be_array(raw) {
                    Some(bytes) => self.firmware_rev = u16::from_be_bytes(bytes),
                    None => self.log_bad_length(code, raw),
                },
                ucp_code::HARDWARE_REV => match be_array(raw) {
                    Some(bytes) => self.hardware_rev = u32::from_be_bytes(bytes),
                    None => self.log_bad_length(code, raw),
                },
                ucp_code::DEVICE_ID => match be_array(raw) {
                    Some(bytes) => self.id = u16::from_be_bytes(bytes),
                    None => self.log_bad_length(code, raw),
                },
                ucp_code::UUID => self.uuid = Some(hex::encode(raw)),
                _ => {}
            }
        }
    }

    fn ipv4(&self, code: u8, raw: &[u8]) -> Option<Ipv4Addr> {
        match be_array::<4>(raw) {
            Some(octets) => Some(Ipv4Addr::from(octets)),
            None => {
                self.log_bad_length(code, raw);
                None
            }
        }
    }

    fn log_bad_length(&self, code: u8, raw: &[u8]) {
        warn!(mac = %self.mac, code, length = raw.len(), "ignoring field with unexpected length");
    }
}

fn text(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn be_array<const N: usize>(raw: &[u8]) -> Option<[u8; N]> {
    raw.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddr {
        "00:04:20:16:05:2b".parse().unwrap()
    }

    #[test]
    fn new_record_holds_zero_values() {
        let record = DeviceRecord::new(mac());
        assert_eq!(record.get("lanIPMode"), Some(&Value::Bool(false)));
        assert_eq!(record.get("hostname"), Some(&Value::Text(String::new())));
        assert_eq!(record.config().count(), DeviceSchema::global().len());
    }

    #[test]
    fn record_serializes_mac_as_text() {
        let mut record = DeviceRecord::new(mac());
        record.name = "Kitchen".into();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mac"], "00:04:20:16:05:2b");
        assert_eq!(json["name"], "Kitchen");
        assert_eq!(json["config"]["lanIPMode"]["value"], false);
    }

    #[test]
    fn set_field_checks_name_type_and_limit() {
        let mut record = DeviceRecord::new(mac());
        record.set_field("WirelessSSID", Value::Text("home".into())).unwrap();
        assert_eq!(record.get("wirelessSSID"), Some(&Value::Text("home".into())));

        assert_eq!(
            record.set_field("volume", Value::Uint8(3)),
            Err(ProtoError::UnknownField("volume".into()))
        );
        assert!(matches!(
            record.set_field("lanGateway", Value::Text("router".into())),
            Err(ProtoError::TypeMismatch { .. })
        ));
        assert!(matches!(
            record.set_field("wirelessWPAMode", Value::Uint8(3)),
            Err(ProtoError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn field_list_populates_identity() {
        let payload = [
            2, 10, b'S', b'q', b'u', b'e', b'e', b'z', b'e', b'b', b'o', b'x',
            3, 8, b'r', b'e', b'c', b'e', b'i', b'v', b'e', b'r',
            4, 1, 1,
            5, 4, 192, 168, 1, 40,
            6, 4, 255, 255, 255, 0,
            7, 4, 192, 168, 1, 1,
            9, 2, 0x00, 0x4d,
            10, 4, 0x00, 0x00, 0x00, 0x02,
            11, 2, 0x00, 0x07,
            12, 12, b'w', b'a', b'i', b't', b'_', b's', b'l', b'i', b'm', b's', b'r', b'v',
            0, 0,
        ];
        let fields = FieldList::decode(&payload).unwrap();
        let mut record = DeviceRecord::new(mac());
        record.apply_field_list(&fields);

        assert_eq!(record.name, "Squeezebox");
        assert_eq!(record.device_type, "receiver");
        assert_eq!(record.dhcp, Some(true));
        assert_eq!(record.ip_addr, Some(Ipv4Addr::new(192, 168, 1, 40)));
        assert_eq!(record.subnet_mask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(record.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(record.firmware_rev, 77);
        assert_eq!(record.hardware_rev, 2);
        assert_eq!(record.id, 7);
        assert_eq!(record.status, "wait_slimsrv");
    }

    #[test]
    fn malformed_identity_values_are_ignored() {
        let payload = [5, 2, 10, 0, 9, 1, 0x4d, 0, 0];
        let mut record = DeviceRecord::new(mac());
        record.ip_addr = Some(Ipv4Addr::new(10, 0, 0, 9));
        record.apply_field_list(&FieldList::decode(&payload).unwrap());
        assert_eq!(record.ip_addr, Some(Ipv4Addr::new(10, 0, 0, 9)));
        assert_eq!(record.firmware_rev, 0);
    }
}
