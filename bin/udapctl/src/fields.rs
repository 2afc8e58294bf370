//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "binary"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "Command-line front end for discovering and configuring devices."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use udap_proto::{Access, DeviceSchema, Limit, SchemaField};

/// Print the schema table.
pub fn run() {
    println!(
        "{:<22} {:>6} {:>4} {:<6} {:<10} {}",
        "FIELD", "OFFSET", "LEN", "TYPE", "ACCESS", "DESCRIPTION"
    );
    for field in DeviceSchema::global().fields() {
        println!(
            "{:<22} {:>6} {:>4} {:<6} {:<10} {}{}",
            field.name,
            field.offset,
            field.wire_length,
            field.semantic_type,
            access_label(field),
            field.description,
            limit_hint(field.limit),
        );
    }
}

fn access_label(field: &SchemaField) -> &'static str {
    match field.access {
        Access::ReadWrite => "read-write",
        Access::ReadOnly => "read-only",
    }
}

fn limit_hint(limit: Limit) -> String {
    match limit {
        Limit::Any => String::new(),
        Limit::Max(max) => format!(" (0..={max})"),
        Limit::OneOf(values) => {
            let values: Vec<String> = values.iter().map(u8::to_string).collect();
            format!(" (one of {})", values.join(", "))
        }
    }
}
