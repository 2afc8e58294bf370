//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "binary"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "Command-line front end for discovering and configuring devices."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use tokio::runtime::Runtime;
use udap_common::AppConfig;
use udap_net::{BroadcastTransport, ClientConfig, DeviceClient};
use udap_proto::{DeviceRecord, DeviceSchema, MacAddr, Value};

/// Options for `discover`.
#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Print the records as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Options for `show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Hardware address of the device, e.g. 00:04:20:16:05:2b.
    pub mac: MacAddr,
    /// Print the record as JSON instead of a listing.
    #[arg(long)]
    pub json: bool,
}

/// Options for `set`.
#[derive(Debug, Args)]
pub struct SetArgs {
    /// Hardware address of the device.
    pub mac: MacAddr,
    /// One or more `field=value` assignments.
    #[arg(required = true, value_name = "FIELD=VALUE")]
    pub assignments: Vec<String>,
}

fn client(config: &AppConfig) -> DeviceClient<BroadcastTransport> {
    DeviceClient::new(
        BroadcastTransport::from(&config.network),
        ClientConfig::from(&config.network),
    )
}

/// List every device answering a discovery broadcast.
pub fn discover(config: &AppConfig, args: DiscoverArgs) -> Result<()> {
    let runtime = Runtime::new()?;
    let devices = runtime.block_on(client(config).discover())?;

    if args.json {
        let records: Vec<&DeviceRecord> = devices.values().collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("No devices found");
        return Ok(());
    }
    println!(
        "{:>3}  {:<17}  {:<20}  {:<12}  {:<15}  {}",
        "#", "MAC", "NAME", "TYPE", "IP", "FIRMWARE"
    );
    for (index, record) in devices.values().enumerate() {
        let ip = record
            .ip_addr
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_owned());
        println!(
            "{:>3}  {:<17}  {:<20}  {:<12}  {:<15}  {}",
            index + 1,
            record.mac.to_string(),
            record.name,
            record.device_type,
            ip,
            record.firmware_rev
        );
    }
    Ok(())
}

/// Read and print a single device.
pub fn show(config: &AppConfig, args: ShowArgs) -> Result<()> {
    let runtime = Runtime::new()?;
    let client = client(config);
    let mut record = DeviceRecord::new(args.mac);
    runtime
        .block_on(client.get_ip(&mut record))
        .with_context(|| format!("reading network settings of {}", args.mac))?;
    let skipped = runtime
        .block_on(client.get_data(&mut record))
        .with_context(|| format!("reading configuration of {}", args.mac))?
        .skipped;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    render_record(&record);
    for err in skipped {
        eprintln!("skipped: {err}");
    }
    Ok(())
}

/// Read the device, apply the assignments and write back what was read.
pub fn set(config: &AppConfig, args: SetArgs) -> Result<()> {
    let assignments = parse_assignments(&args.assignments)?;

    let runtime = Runtime::new()?;
    let client = client(config);
    let mut record = DeviceRecord::new(args.mac);
    let outcome = runtime
        .block_on(client.update(&mut record, &assignments))
        .with_context(|| format!("updating configuration of {}", args.mac))?;
    if outcome.is_complete() {
        println!("Saved {} fields on {}", outcome.changed, args.mac);
        Ok(())
    } else {
        bail!(
            "device {} acknowledged {} of {} fields",
            args.mac,
            outcome.changed,
            outcome.requested
        )
    }
}

/// Resolve `field=value` pairs against the schema before any network I/O.
fn parse_assignments(raw: &[String]) -> Result<Vec<(&'static str, Value)>> {
    let schema = DeviceSchema::global();
    raw.iter()
        .map(|assignment| -> Result<(&'static str, Value)> {
            let (name, input) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("expected FIELD=VALUE, got `{assignment}`"))?;
            let field = schema
                .by_name(name.trim())
                .ok_or_else(|| anyhow!("unknown field `{}`", name.trim()))?;
            if !field.is_writable() {
                bail!("field `{}` is read-only", field.name);
            }
            let value = Value::parse(field.semantic_type, input)?;
            field.check(&value)?;
            Ok((field.name, value))
        })
        .collect()
}

fn render_record(record: &DeviceRecord) {
    println!("Device {}", record.mac);
    if let Some(ip) = record.ip_addr {
        println!("  {:<22} {}", "ip", ip);
    }
    if let Some(mask) = record.subnet_mask {
        println!("  {:<22} {}", "subnet mask", mask);
    }
    if let Some(gateway) = record.gateway {
        println!("  {:<22} {}", "gateway", gateway);
    }
    if let Some(dhcp) = record.dhcp {
        println!("  {:<22} {}", "dhcp", dhcp);
    }
    for (name, value) in record.config() {
        println!("  {name:<22} {value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_resolve_against_schema() {
        let parsed = parse_assignments(&[
            "HOSTNAME=den".to_owned(),
            "lanIPMode=false".to_owned(),
        ])
        .unwrap();
        assert_eq!(parsed[0], ("hostname", Value::Text("den".into())));
        assert_eq!(parsed[1], ("lanIPMode", Value::Bool(false)));
    }

    #[test]
    fn read_only_and_out_of_range_assignments_are_refused() {
        assert!(parse_assignments(&["squeezeCenterName=x".to_owned()]).is_err());
        assert!(parse_assignments(&["interface=7".to_owned()]).is_err());
        assert!(parse_assignments(&["hostname".to_owned()]).is_err());
    }
}
