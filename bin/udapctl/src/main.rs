//! ---
//! udap_section: "05-networking-external-interfaces"
//! udap_subsection: "binary"
//! udap_type: "source"
//! udap_scope: "code"
//! udap_description: "Command-line front end for discovering and configuring devices."
//! udap_version: "v0.1.0"
//! udap_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use udap_common::{init_tracing, AppConfig, LoadedAppConfig};

mod device;
mod fields;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Discover and configure UDAP network audio devices",
    long_about = None
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Broadcast a discovery request and list responding devices")]
    Discover(device::DiscoverArgs),
    #[command(about = "Read and print the network settings and configuration of a device")]
    Show(device::ShowArgs),
    #[command(about = "Change configuration fields on a device")]
    Set(device::SetArgs),
    #[command(about = "List the configuration fields devices expose")]
    Fields,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("udapctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no command given, see `udapctl --help`");
    };

    if let Commands::Fields = command {
        fields::run();
        return Ok(());
    }

    let loaded = load_config(cli.config)?;
    init_tracing("udapctl", &loaded.config.logging)?;
    if let Some(source) = &loaded.source {
        tracing::debug!(path = %source.display(), "configuration loaded");
    }

    match command {
        Commands::Discover(args) => device::discover(&loaded.config, args),
        Commands::Show(args) => device::show(&loaded.config, args),
        Commands::Set(args) => device::set(&loaded.config, args),
        Commands::Fields => Ok(()),
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<LoadedAppConfig> {
    let loaded = match explicit {
        Some(path) => AppConfig::load_with_source(&[path])?,
        None => AppConfig::load_or_default(&[
            PathBuf::from("udap.toml"),
            PathBuf::from("/etc/udap/udap.toml"),
        ])?,
    };
    loaded.config.validate()?;
    Ok(loaded)
}
