//! `convert` command: one source file through the engine to one output file.
//!
//! The output is written whenever translation succeeds, including when the
//! final report is critical, so the result can be reviewed. The exit status
//! reflects the final severity.

use std::fs;

use anyhow::{bail, Context, Result};
use ros_config_core::write_file;
use ros_migrate::conversion_summary::{render as render_summary, summarize, ConversionSummary};
use ros_migrate::engine::{Engine, TranslationOutcome, TranslationRequest};
use ros_migrate::report::render_outcome;
use ros_migrate::settings::load_settings;
use ros_migrate::validate::Severity;
use serde::Serialize;
use tracing::info;

use crate::cli::{ConvertArgs, OutputFormat};
use crate::path_guard::ensure_distinct_output;

#[derive(Serialize)]
struct ConvertJson<'a> {
    output: String,
    summary: ConversionSummary,
    #[serde(flatten)]
    outcome: &'a TranslationOutcome,
}

pub fn run_convert(args: ConvertArgs) -> Result<()> {
    ensure_distinct_output(&args.output, &args.input)?;

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut settings = load_settings(args.config.as_deref()).with_context(|| {
        format!(
            "failed to load settings {}",
            args.config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    })?;
    if let Some(command) = &args.assist_command {
        settings.assist.command = Some(command.clone());
        settings.assist.enabled = true;
    }
    let engine = Engine::from_settings(settings).context("failed to load engine data")?;

    let request = TranslationRequest {
        source_device: args.source_device.clone(),
        source_version: args.source_version.clone(),
        strict_preserve: !args.no_strict_preserve,
        apply_compliance: args.compliance,
        ..TranslationRequest::new(source, &args.target_device, &args.target_version)
    };
    let outcome = engine
        .translate(&request)
        .with_context(|| format!("failed to translate {}", args.input.display()))?;

    write_file(&outcome.config, &args.output)
        .with_context(|| format!("failed to write output {}", args.output.display()))?;
    info!(output = %args.output.display(), "wrote translated config");

    let summary = summarize(&outcome.config);
    match args.format {
        OutputFormat::Text => {
            println!("{}", render_outcome(&outcome, args.verbose));
            println!("{}", render_summary(summary));
        }
        OutputFormat::Json => {
            let payload = ConvertJson {
                output: args.output.display().to_string(),
                summary,
                outcome: &outcome,
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    match outcome.validation.severity {
        Severity::CriticalFailure => bail!(
            "conversion finished with critical findings: {} issues",
            outcome.validation.issues.len()
        ),
        Severity::Warning if args.strict => bail!(
            "conversion failed in strict mode: {} warnings",
            outcome.validation.issues.len()
        ),
        _ => Ok(()),
    }
}
