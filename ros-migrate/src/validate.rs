use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::classify::{classify, Classification};
use crate::extract::{ipv4_literals, secret_values};
use crate::section::Section;
use crate::source::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    CriticalFailure,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::CriticalFailure => "critical",
        }
    }
}

/// Configurable severity thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    /// Missing IPs above this count are critical.
    pub warning_ip_limit: usize,
    /// Firewall rule loss above this percentage is critical.
    pub firewall_drop_percent: u32,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            warning_ip_limit: 10,
            firewall_drop_percent: 20,
        }
    }
}

/// Which path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePath {
    Assisted,
    Deterministic,
}

/// Why the deterministic path was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    NotConfigured,
    Disabled,
    InputTooLarge { bytes: usize, limit: usize },
    AssistFailed { message: String },
    TimedOut { seconds: u64 },
    ValidationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackRecord {
    #[serde(flatten)]
    pub reason: FallbackReason,
}

/// Outcome of an earlier candidate in the same request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub path: CandidatePath,
    pub severity: Severity,
    pub missing_ips: usize,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskChange {
    pub host: Ipv4Addr,
    pub source: Vec<u8>,
    pub output: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallDelta {
    pub source: usize,
    pub output: usize,
    /// `source - output`; negative when the output gained rules.
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Facts about a candidate that the texts alone do not carry.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub thresholds: ValidationThresholds,
    pub unmapped_interfaces: Vec<String>,
    pub unclassified_lines: usize,
    pub dropped_constructs: Vec<String>,
    pub fallback: Option<FallbackRecord>,
    pub history: Vec<AttemptRecord>,
}

/// Completeness report for one candidate. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub severity: Severity,
    pub missing_ips: Vec<Ipv4Addr>,
    pub mask_changes: Vec<MaskChange>,
    pub missing_secrets: Vec<String>,
    pub missing_users: Vec<String>,
    pub firewall_rule_delta: FirewallDelta,
    pub missing_sections: Vec<Section>,
    pub misplaced_lines: usize,
    pub unmapped_interfaces: Vec<String>,
    pub unclassified_lines: usize,
    pub dropped_constructs: Vec<String>,
    pub fallback: Option<FallbackRecord>,
    pub history: Vec<AttemptRecord>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::CriticalFailure
    }

    pub fn attempt(&self, path: CandidatePath) -> AttemptRecord {
        AttemptRecord {
            path,
            severity: self.severity,
            missing_ips: self.missing_ips.len(),
            issues: self.issues.iter().map(|i| i.message.clone()).collect(),
        }
    }
}

/// Everything the completeness check compares, extracted from one text.
#[derive(Debug, Default)]
struct ConfigFacts {
    statements: usize,
    masks: BTreeMap<Ipv4Addr, BTreeSet<u8>>,
    secrets: BTreeSet<String>,
    users: BTreeSet<String>,
    firewall_rules: usize,
    sections: BTreeSet<Section>,
    misplaced: usize,
}

impl ConfigFacts {
    fn collect(text: &str) -> Self {
        let source = tokenize(text, None, None);
        let classification: Classification = classify(&source);
        let mut facts = ConfigFacts {
            misplaced: classification.rehomes.len(),
            ..Default::default()
        };

        for line in source.statements() {
            facts.statements += 1;
            for lit in ipv4_literals(&line.text) {
                let masks = facts.masks.entry(lit.host).or_default();
                if let Some(prefix) = lit.prefix {
                    masks.insert(prefix);
                }
            }
        }

        for entry in &classification.entries {
            facts.sections.insert(entry.section.clone());
            if entry.section.is_firewall_rules() && entry.verb() == Some("add") {
                facts.firewall_rules += 1;
            }
            let Some(stmt) = entry.statement.as_ref() else {
                continue;
            };
            facts.secrets.extend(secret_values(stmt));
            if matches!(entry.section, Section::User | Section::PppSecret) && stmt.verb == "add" {
                if let Some(name) = stmt.value("name") {
                    facts.users.insert(name.to_string());
                }
            }
        }
        facts
    }

    fn satisfies(&self, section: &Section) -> bool {
        self.sections.contains(section)
            || match section {
                Section::OspfNetwork => self.sections.contains(&Section::OspfInterfaceTemplate),
                Section::BgpNetwork => self.sections.contains(&Section::FirewallAddressList),
                _ => false,
            }
    }
}

fn issue(severity: Severity, code: &str, message: String) -> ValidationIssue {
    ValidationIssue {
        severity,
        code: code.to_string(),
        message,
    }
}

/// Compare `candidate` against `source` for completeness.
pub fn validate(source: &str, candidate: &str, ctx: &ValidationContext) -> ValidationReport {
    let src = ConfigFacts::collect(source);
    let out = ConfigFacts::collect(candidate);
    let limits = ctx.thresholds;
    let mut issues = Vec::new();

    let missing_ips: Vec<Ipv4Addr> = src
        .masks
        .keys()
        .filter(|host| !out.masks.contains_key(host))
        .copied()
        .collect();
    if !missing_ips.is_empty() {
        let severity = if missing_ips.len() > limits.warning_ip_limit {
            Severity::CriticalFailure
        } else {
            Severity::Warning
        };
        let sample: Vec<String> = missing_ips.iter().take(5).map(ToString::to_string).collect();
        issues.push(issue(
            severity,
            "missing_ips",
            format!("{} addresses missing ({})", missing_ips.len(), sample.join(", ")),
        ));
    }

    let mask_changes: Vec<MaskChange> = src
        .masks
        .iter()
        .filter_map(|(host, src_masks)| {
            let out_masks = out.masks.get(host)?;
            if src_masks.is_empty() || out_masks.is_empty() || !src_masks.is_disjoint(out_masks) {
                return None;
            }
            Some(MaskChange {
                host: *host,
                source: src_masks.iter().copied().collect(),
                output: out_masks.iter().copied().collect(),
            })
        })
        .collect();
    for change in &mask_changes {
        issues.push(issue(
            Severity::Warning,
            "mask_change",
            format!(
                "{} prefix changed from /{:?} to /{:?}",
                change.host, change.source, change.output
            ),
        ));
    }

    let missing_secrets: Vec<String> = src.secrets.difference(&out.secrets).cloned().collect();
    if !missing_secrets.is_empty() {
        issues.push(issue(
            Severity::CriticalFailure,
            "missing_secrets",
            format!("{} secret values missing", missing_secrets.len()),
        ));
    }

    let missing_users: Vec<String> = src.users.difference(&out.users).cloned().collect();
    if !missing_users.is_empty() {
        issues.push(issue(
            Severity::CriticalFailure,
            "missing_users",
            format!("users missing: {}", missing_users.join(", ")),
        ));
    }

    let firewall_rules = FirewallDelta {
        source: src.firewall_rules,
        output: out.firewall_rules,
        delta: src.firewall_rules as i64 - out.firewall_rules as i64,
    };
    if firewall_rules.delta > 0 {
        let lost = firewall_rules.delta as u64 * 100;
        let allowed = src.firewall_rules as u64 * u64::from(limits.firewall_drop_percent);
        let severity = if lost > allowed {
            Severity::CriticalFailure
        } else {
            Severity::Warning
        };
        issues.push(issue(
            severity,
            "firewall_rules",
            format!(
                "firewall rules dropped from {} to {}",
                firewall_rules.source, firewall_rules.output
            ),
        ));
    }

    let missing_sections: Vec<Section> = src
        .sections
        .iter()
        .filter(|section| section.is_canonical() && !out.satisfies(section))
        .cloned()
        .collect();
    if !missing_sections.is_empty() {
        let names: Vec<String> = missing_sections.iter().map(Section::name).collect();
        issues.push(issue(
            Severity::CriticalFailure,
            "missing_sections",
            format!("sections missing: {}", names.join(", ")),
        ));
    }

    if out.misplaced > 0 {
        issues.push(issue(
            Severity::CriticalFailure,
            "misplaced_lines",
            format!("{} protocol lines under a foreign section", out.misplaced),
        ));
    }

    if out.statements == 0 && src.statements > 0 {
        issues.push(issue(
            Severity::CriticalFailure,
            "empty_candidate",
            "candidate has no statements".to_string(),
        ));
    }

    if !ctx.unmapped_interfaces.is_empty() {
        issues.push(issue(
            Severity::Warning,
            "unmapped_interfaces",
            format!(
                "no target port for: {}",
                ctx.unmapped_interfaces.join(", ")
            ),
        ));
    }

    let severity = issues
        .iter()
        .map(|i| i.severity)
        .max()
        .unwrap_or(Severity::Ok);

    ValidationReport {
        severity,
        missing_ips,
        mask_changes,
        missing_secrets,
        missing_users,
        firewall_rule_delta: firewall_rules,
        missing_sections,
        misplaced_lines: out.misplaced,
        unmapped_interfaces: ctx.unmapped_interfaces.clone(),
        unclassified_lines: ctx.unclassified_lines,
        dropped_constructs: ctx.dropped_constructs.clone(),
        fallback: ctx.fallback.clone(),
        history: ctx.history.clone(),
        issues,
    }
}

pub fn render_validation_text(report: &ValidationReport, verbose: bool) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "validation severity={} missing_ips={} firewall_rules={}/{}",
        report.severity.as_str(),
        report.missing_ips.len(),
        report.firewall_rule_delta.output,
        report.firewall_rule_delta.source
    ));
    if let Some(fallback) = &report.fallback {
        let reason = serde_json::to_value(&fallback.reason)
            .ok()
            .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
            .unwrap_or_default();
        out.push(format!("fallback reason={reason}"));
    }
    out.push("issues".to_string());
    if report.issues.is_empty() {
        out.push("- none".to_string());
    }
    for issue in &report.issues {
        out.push(format!(
            "- [{}] {}: {}",
            issue.severity.as_str(),
            issue.code,
            issue.message
        ));
    }
    if verbose {
        for ip in &report.missing_ips {
            out.push(format!("missing ip {ip}"));
        }
        for dropped in &report.dropped_constructs {
            out.push(format!("dropped {dropped}"));
        }
        if report.unclassified_lines > 0 {
            out.push(format!("unclassified lines {}", report.unclassified_lines));
        }
        for attempt in &report.history {
            out.push(format!(
                "earlier attempt path={:?} severity={} missing_ips={}",
                attempt.path,
                attempt.severity.as_str(),
                attempt.missing_ips
            ));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{validate, Severity, ValidationContext};
    use crate::section::Section;

    fn addresses(count: usize) -> String {
        let mut text = String::from("/ip address\n");
        for i in 0..count {
            text.push_str(&format!("add address=10.1.{i}.1/24 interface=ether1\n"));
        }
        text
    }

    #[test]
    fn identical_text_is_ok() {
        let text = addresses(3);
        let report = validate(&text, &text, &ValidationContext::default());
        assert_eq!(report.severity, Severity::Ok);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn ip_loss_thresholds() {
        let source = addresses(30);
        let few = addresses(25);
        let report = validate(&source, &few, &ValidationContext::default());
        assert_eq!(report.missing_ips.len(), 5);
        assert_eq!(report.severity, Severity::Warning);

        let many = addresses(15);
        let report = validate(&source, &many, &ValidationContext::default());
        assert_eq!(report.missing_ips.len(), 15);
        assert_eq!(report.severity, Severity::CriticalFailure);
    }

    #[test]
    fn mask_change_is_a_warning_not_a_loss() {
        let report = validate(
            "/ip address\nadd address=10.0.0.1/24 interface=ether1\n",
            "/ip address\nadd address=10.0.0.1/25 interface=ether1\n",
            &ValidationContext::default(),
        );
        assert!(report.missing_ips.is_empty());
        assert_eq!(report.mask_changes.len(), 1);
        assert_eq!(report.severity, Severity::Warning);
    }

    #[test]
    fn host_prefix_added_on_output_is_not_a_change() {
        let report = validate(
            "/routing bgp peer\nadd remote-address=203.0.113.1 remote-as=65002\n",
            "/routing bgp connection\nadd remote.address=203.0.113.1/32 remote.as=65002\n",
            &ValidationContext::default(),
        );
        assert_eq!(report.severity, Severity::Ok);
    }

    #[test]
    fn secrets_users_and_sections_are_critical() {
        let source = "/user\nadd name=netops password=N3tops!\n/snmp\nset enabled=yes\n";
        let report = validate(source, "/snmp\nset enabled=yes\n", &ValidationContext::default());
        assert_eq!(report.missing_secrets, vec!["N3tops!".to_string()]);
        assert_eq!(report.missing_users, vec!["netops".to_string()]);
        assert_eq!(report.missing_sections, vec![Section::User]);
        assert_eq!(report.severity, Severity::CriticalFailure);
    }

    #[test]
    fn legacy_sections_are_satisfied_by_their_successors() {
        let report = validate(
            "/routing bgp network\nadd network=192.168.10.0/24\n",
            "/ip firewall address-list\nadd list=bgp-networks address=192.168.10.0/24\n",
            &ValidationContext::default(),
        );
        assert!(report.missing_sections.is_empty());
    }

    #[test]
    fn firewall_drop_thresholds() {
        let rules = |n: usize| {
            let mut text = String::from("/ip firewall filter\n");
            for i in 0..n {
                text.push_str(&format!("add action=accept chain=input dst-port={i} protocol=tcp\n"));
            }
            text
        };
        let report = validate(&rules(10), &rules(8), &ValidationContext::default());
        assert_eq!(report.firewall_rule_delta.delta, 2);
        assert_eq!(report.severity, Severity::Warning);
        let report = validate(&rules(10), &rules(7), &ValidationContext::default());
        assert_eq!(report.severity, Severity::CriticalFailure);
    }

    #[test]
    fn misplaced_and_empty_candidates_are_critical() {
        let source = "/ip address\nadd address=10.0.0.1/24 interface=ether1\n";
        let report = validate(source, "", &ValidationContext::default());
        assert!(report.issues.iter().any(|i| i.code == "empty_candidate"));
        assert!(report.is_critical());

        let misplaced = "/ip address\nadd address=10.0.0.1/24 interface=ether1\n/routing bfd configuration\nadd remote.address=10.9.9.9 remote.as=1\n";
        let report = validate(misplaced, misplaced, &ValidationContext::default());
        assert_eq!(report.misplaced_lines, 1);
        assert!(report.is_critical());
    }

    #[test]
    fn unmapped_interfaces_warn() {
        let text = addresses(1);
        let ctx = ValidationContext {
            unmapped_interfaces: vec!["sfp3".to_string()],
            ..Default::default()
        };
        assert_eq!(validate(&text, &text, &ctx).severity, Severity::Warning);
    }
}
