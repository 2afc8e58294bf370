//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "UDP broadcast transport and device operations."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use udap_common::NetworkConfig;
use udap_proto::constants::ucp_code;
use udap_proto::{
    decode_save_ack, DataRecord, DataRecordCodec, DeviceRecord, FieldList, MacAddr, Method,
    Packet, SchemaField, Value, UDAP_PORT,
};

use crate::transport::Transport;
use crate::{NetError, Result};

/// Port and timeouts used by [`DeviceClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Destination port for broadcast requests.
    pub port: u16,
    /// How long discovery keeps collecting replies.
    pub discover_timeout: Duration,
    /// How long a single-device request waits for its reply.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: UDAP_PORT,
            discover_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_millis(500),
        }
    }
}

impl From<&NetworkConfig> for ClientConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            port: config.port,
            discover_timeout: config.discover_timeout,
            request_timeout: config.request_timeout,
        }
    }
}

/// Result of a save: how many fields were sent and how many the device
/// reported as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Fields carried by the save request.
    pub requested: u16,
    /// Fields the device acknowledged.
    pub changed: u16,
}

impl SaveOutcome {
    /// Whether the device acknowledged every field that was sent.
    pub fn is_complete(&self) -> bool {
        self.changed == self.requested
    }
}

/// Runs discovery and per-device read/write operations over a [`Transport`].
pub struct DeviceClient<T> {
    transport: T,
    config: ClientConfig,
    codec: DataRecordCodec<'static>,
}

impl<T: Transport> DeviceClient<T> {
    /// Build a client using the built-in device schema.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            codec: DataRecordCodec::default(),
        }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Broadcast an advertised-discover request and build one record per
    /// responding device, keyed by hardware address. Unparseable replies are
    /// logged and skipped.
    pub async fn discover(&self) -> Result<IndexMap<MacAddr, DeviceRecord>> {
        let request = Packet::discover().assemble();
        let replies = self
            .transport
            .send_then_collect(self.config.port, &request, self.config.discover_timeout)
            .await?;

        let mut devices = IndexMap::new();
        for datagram in replies {
            let packet = match Packet::parse(&datagram.bytes) {
                Ok(packet) => packet,
                Err(err) => {
                    warn!(sender = %datagram.sender, %err, "ignoring malformed discovery reply");
                    continue;
                }
            };
            if packet.method != Method::AdvDiscover {
                debug!(sender = %datagram.sender, method = ?packet.method, "ignoring non-discovery reply");
                continue;
            }
            let Some(mac) = packet.source.address.mac() else {
                debug!(sender = %datagram.sender, "ignoring reply without a hardware address");
                continue;
            };
            let fields = match FieldList::decode(&packet.payload) {
                Ok(fields) => fields,
                Err(err) => {
                    warn!(%mac, %err, "ignoring discovery reply with bad field list");
                    continue;
                }
            };
            let mut record = DeviceRecord::new(mac);
            record.apply_field_list(&fields);
            devices.insert(mac, record);
        }
        info!(devices = devices.len(), "discovery finished");
        Ok(devices)
    }

    /// Ask a device for its network settings and copy them into `record`.
    pub async fn get_ip(&self, record: &mut DeviceRecord) -> Result<()> {
        let reply = self
            .exchange(Packet::request(Method::GetIp, record.mac))
            .await?;
        let fields = FieldList::decode(&reply.payload)?;
        record.apply_field_list(&fields);
        if fields.get(ucp_code::IP_ADDR).is_none() || record.ip_addr.is_none() {
            return Err(NetError::NoAddressReported(record.mac));
        }
        info!(mac = %record.mac, ip = ?record.ip_addr, "read network settings");
        Ok(())
    }

    /// Read every schema field from the device into `record`. Returns the
    /// decoded reply, including the entries that were skipped.
    pub async fn get_data(&self, record: &mut DeviceRecord) -> Result<DataRecord> {
        let request =
            Packet::request(Method::GetData, record.mac).with_payload(self.codec.retrieve_request());
        let reply = self.exchange(request).await?;
        let decoded = self.codec.decode(&reply.payload)?;
        record.apply_data_record(&decoded);
        info!(
            mac = %record.mac,
            fields = decoded.entries.len(),
            skipped = decoded.skipped.len(),
            "read configuration"
        );
        Ok(decoded)
    }

    /// Write every schema field of `record` to the device.
    pub async fn save_data(&self, record: &DeviceRecord) -> Result<SaveOutcome> {
        self.save_fields(record, self.codec.schema().fields()).await
    }

    /// Write the given fields of `record` to the device.
    pub async fn save_fields<'f>(
        &self,
        record: &DeviceRecord,
        fields: impl IntoIterator<Item = &'f SchemaField>,
    ) -> Result<SaveOutcome> {
        let save = DataRecordCodec::save_request_for(record, fields);
        let request = Packet::request(Method::SetData, record.mac).with_payload(save.payload);
        let reply = self.exchange(request).await?;
        let outcome = SaveOutcome {
            requested: save.count,
            changed: decode_save_ack(&reply.payload)?,
        };
        if outcome.is_complete() {
            info!(mac = %record.mac, fields = outcome.changed, "saved configuration");
        } else {
            warn!(
                mac = %record.mac,
                requested = outcome.requested,
                changed = outcome.changed,
                "device acknowledged fewer fields than sent"
            );
        }
        Ok(outcome)
    }

    /// Read the device, apply `changes` and write back only the fields the
    /// device reported or that were changed. Fields missing from the read
    /// reply are never overwritten with zero values.
    pub async fn update(
        &self,
        record: &mut DeviceRecord,
        changes: &[(&str, Value)],
    ) -> Result<SaveOutcome> {
        let read = self.get_data(record).await?;
        for (name, value) in changes {
            record.set_field(name, value.clone())?;
        }
        let fields: Vec<&SchemaField> = self
            .codec
            .schema()
            .fields()
            .iter()
            .filter(|field| {
                read.entries.iter().any(|entry| entry.offset == field.offset)
                    || changes
                        .iter()
                        .any(|(name, _)| field.name.eq_ignore_ascii_case(name))
            })
            .collect();
        if !read.skipped.is_empty() {
            warn!(
                mac = %record.mac,
                skipped = read.skipped.len(),
                "saving only fields read back from the device"
            );
        }
        self.save_fields(record, fields).await
    }

    async fn exchange(&self, request: Packet) -> Result<Packet> {
        let expected = request.method;
        let datagram = self
            .transport
            .send_then_await_one(self.config.port, &request.assemble(), self.config.request_timeout)
            .await?;
        let reply = Packet::parse(&datagram.bytes)?;
        if reply.method != expected {
            return Err(NetError::UnexpectedMethod {
                expected,
                actual: reply.method,
            });
        }
        Ok(reply)
    }
}
