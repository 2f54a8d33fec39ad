use std::fs;

use anyhow::{bail, Context, Result};
use ros_migrate::report::render_validation;
use ros_migrate::settings::load_settings;
use ros_migrate::validate::{validate, Severity, ValidationContext};

use crate::cli::{OutputFormat, VerifyArgs};

pub fn run_verify(args: VerifyArgs) -> Result<()> {
    let source = fs::read_to_string(&args.source)
        .with_context(|| format!("failed to read {}", args.source.display()))?;
    let candidate = fs::read_to_string(&args.candidate)
        .with_context(|| format!("failed to read {}", args.candidate.display()))?;
    let settings = load_settings(args.config.as_deref())?;

    let ctx = ValidationContext {
        thresholds: settings.validation,
        ..Default::default()
    };
    let report = validate(&source, &candidate, &ctx);

    match args.format {
        OutputFormat::Text => println!("{}", render_validation(&report, args.verbose)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.severity == Severity::CriticalFailure {
        bail!("verify failed: {} issues", report.issues.len());
    }
    if args.strict && report.severity == Severity::Warning {
        bail!("verify failed in strict mode: {} warnings", report.issues.len());
    }
    Ok(())
}
