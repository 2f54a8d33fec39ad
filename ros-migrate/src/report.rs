use colored::Colorize;

use crate::devices::DeviceCatalog;
use crate::engine::TranslationOutcome;
use crate::interface_map::{AssignMethod, InterfaceMapping};
use crate::validate::{render_validation_text, Severity, ValidationReport};

fn paint(severity: Severity, text: &str) -> String {
    match severity {
        Severity::Ok => text.green().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::CriticalFailure => text.red().to_string(),
    }
}

/// Validation report for terminal output; issue lines take their severity color.
pub fn render_validation(report: &ValidationReport, verbose: bool) -> String {
    render_validation_text(report, verbose)
        .lines()
        .map(|line| {
            if line.starts_with("validation ") {
                paint(report.severity, line)
            } else if line.starts_with("- [critical]") {
                line.red().to_string()
            } else if line.starts_with("- [warning]") {
                line.yellow().to_string()
            } else if line.starts_with("fallback ") {
                line.magenta().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per mapped interface.
pub fn render_mapping(mapping: &InterfaceMapping) -> String {
    let mut out = vec!["interface_mapping".to_string()];
    if mapping.entries.is_empty() {
        out.push("- none".to_string());
    }
    for entry in &mapping.entries {
        let line = format!("- {} -> {} ({:?})", entry.source, entry.target, entry.method);
        out.push(match entry.method {
            AssignMethod::Unmapped => line.yellow().to_string(),
            _ => line,
        });
    }
    out.join("\n")
}

pub fn render_outcome(outcome: &TranslationOutcome, verbose: bool) -> String {
    let mut out = Vec::new();
    out.push(
        format!(
            "source={} ({}) target_dialect={:?} rules={}",
            outcome.source_version,
            outcome.source_device,
            outcome.target_dialect,
            outcome.rules_source
        )
        .cyan()
        .to_string(),
    );
    out.push(render_mapping(&outcome.interface_mapping));
    out.push(render_validation(&outcome.validation, verbose));
    if verbose {
        let trace: Vec<String> = outcome.trace.iter().map(|s| format!("{s:?}")).collect();
        out.push(format!("trace {}", trace.join(" -> ")));
    }
    out.join("\n")
}

pub fn render_devices(catalog: &DeviceCatalog) -> String {
    let mut out = vec![format!("devices source={}", catalog.source()).cyan().to_string()];
    for device in catalog.devices() {
        let ports = device.port_names();
        out.push(format!(
            "- {} ports={} management={} aliases={}",
            device.model,
            ports.len(),
            device.management_port().unwrap_or_else(|| "-".to_string()),
            device.aliases.join(",")
        ));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_devices, render_mapping};
    use crate::devices::DeviceCatalog;
    use crate::interface_map::{AssignMethod, InterfaceAssignment, InterfaceMapping};

    #[test]
    fn mapping_lines() {
        colored::control::set_override(false);
        let mapping = InterfaceMapping {
            entries: vec![InterfaceAssignment {
                source: "sfp-sfpplus1".to_string(),
                target: "sfp28-1".to_string(),
                method: AssignMethod::Ordinal,
            }],
            unmapped: Vec::new(),
        };
        assert_eq!(
            render_mapping(&mapping),
            "interface_mapping\n- sfp-sfpplus1 -> sfp28-1 (Ordinal)"
        );
    }

    #[test]
    fn device_listing_has_every_model() {
        colored::control::set_override(false);
        let catalog = DeviceCatalog::embedded().expect("catalog");
        let text = render_devices(&catalog);
        assert!(text.starts_with("devices source=embedded"));
        assert!(text.contains("- CCR2216-1G-12XS-2XQ ports="));
        assert_eq!(text.lines().count(), catalog.devices().len() + 1);
    }
}
