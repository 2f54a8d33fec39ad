use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ros_migrate::classify::classify;
use ros_migrate::devices::DeviceCatalog;
use ros_migrate::engine::Engine;
use ros_migrate::inspect::{build_inventory, render_inventory, SourceInventory};
use ros_migrate::interface_map::{InterfaceMapping, PortLayout};
use ros_migrate::report::{render_devices, render_mapping};
use ros_migrate::settings::EngineSettings;
use ros_migrate::source::tokenize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;
mod convert;
mod path_guard;
mod verify_cmd;

use cli::{Cli, Command, DevicesArgs, InspectArgs, OutputFormat};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => convert::run_convert(args),
        Command::Verify(args) => verify_cmd::run_verify(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Devices(args) => run_devices(args),
    }
}

/// Logs go to stderr so stdout stays parseable; `RUST_LOG` overrides the level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Serialize)]
struct InspectReport {
    #[serde(flatten)]
    inventory: SourceInventory,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface_mapping: Option<InterfaceMapping>,
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let inventory = build_inventory(
        &text,
        args.source_version.as_deref(),
        args.source_device.as_deref(),
    );

    let interface_mapping = match &args.target_device {
        Some(target) => {
            let engine = Engine::from_settings(EngineSettings {
                devices_dir: args.devices_dir.clone(),
                ..Default::default()
            })
            .context("failed to load engine data")?;
            let Some(profile) = engine.catalog().find(target) else {
                bail!("unknown target device: {target}");
            };
            let source = tokenize(
                &text,
                args.source_version.as_deref(),
                args.source_device.as_deref(),
            );
            let classification = classify(&source);
            Some(engine.map_interfaces(&source, &classification, PortLayout::from(profile)))
        }
        None => None,
    };

    match args.format {
        OutputFormat::Text => {
            println!("{}", render_inventory(&inventory));
            if let Some(mapping) = &interface_mapping {
                println!("{}", render_mapping(mapping));
            }
        }
        OutputFormat::Json => {
            let report = InspectReport {
                inventory,
                interface_mapping,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn run_devices(args: DevicesArgs) -> Result<()> {
    let catalog = DeviceCatalog::load(args.devices_dir.as_deref())
        .context("failed to load device catalog")?;
    match args.format {
        OutputFormat::Text => println!("{}", render_devices(&catalog)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(catalog.devices())?),
    }
    Ok(())
}

