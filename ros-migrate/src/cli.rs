use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "ros-migrate")]
#[command(about = "Translate and validate RouterOS configurations across models and firmware")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Translate one exported config toward a target device and firmware.
    Convert(ConvertArgs),
    /// Check a candidate config for completeness against its source.
    Verify(VerifyArgs),
    /// Show detection, section inventory and interface mapping for one config.
    Inspect(InspectArgs),
    /// List the device catalog.
    Devices(DevicesArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Exported source config (.rsc).
    pub input: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
    /// Target model or alias from the device catalog.
    #[arg(long)]
    pub target_device: String,
    /// Target firmware version, e.g. 7.15.
    #[arg(long)]
    pub target_version: String,
    /// Override the model detected from the export header.
    #[arg(long)]
    pub source_device: Option<String>,
    /// Override the firmware version detected from the export header.
    #[arg(long)]
    pub source_version: Option<String>,
    /// Normalize to house style (drop `disabled=no`, empty comments).
    #[arg(long)]
    pub no_strict_preserve: bool,
    /// Append the compliance baseline block.
    #[arg(long)]
    pub compliance: bool,
    /// Engine settings TOML.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// External assistant command; enables assisted rewriting.
    #[arg(long)]
    pub assist_command: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fail on warnings as well as critical findings.
    #[arg(long)]
    pub strict: bool,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Original config.
    pub source: PathBuf,
    /// Translated config to check.
    pub candidate: PathBuf,
    /// Engine settings TOML (validation thresholds).
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(long)]
    pub strict: bool,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Also resolve the interface mapping toward this device.
    #[arg(long)]
    pub target_device: Option<String>,
    #[arg(long)]
    pub source_device: Option<String>,
    #[arg(long)]
    pub source_version: Option<String>,
    #[arg(long)]
    pub devices_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct DevicesArgs {
    /// Directory of catalog TOML files layered over the embedded catalog.
    #[arg(long)]
    pub devices_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
