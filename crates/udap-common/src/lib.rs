//! ---
//! udap_section: "01-core-functionality"
//! udap_subsection: "module"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "Shared configuration and logging primitives."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
//! Configuration loading and tracing initialisation shared by the UDAP
//! workspace binaries.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, NetworkConfig};
pub use logging::{init_tracing, LogFormat};
