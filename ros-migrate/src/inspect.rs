//! Read-only inventory of a source config: what was detected, which sections
//! it has, and which lines the classifier moved or merged.

use serde::Serialize;

use crate::classify::{classify, Duplicate, Rehome};
use crate::detect::{Detection, Dialect};
use crate::interface_map::referenced_interfaces;
use crate::source::tokenize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCount {
    pub section: String,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInventory {
    pub version: Detection,
    pub model: Detection,
    pub dialect: Dialect,
    pub statements: usize,
    pub sections: Vec<SectionCount>,
    pub rehomes: Vec<Rehome>,
    pub duplicates: Vec<Duplicate>,
    pub unclassified: Vec<usize>,
    pub interfaces: Vec<String>,
}

pub fn build_inventory(
    text: &str,
    version_hint: Option<&str>,
    model_hint: Option<&str>,
) -> SourceInventory {
    let source = tokenize(text, version_hint, model_hint);
    let classification = classify(&source);

    let mut sections: Vec<SectionCount> = Vec::new();
    for section in classification.sections() {
        let entries = classification
            .entries
            .iter()
            .filter(|e| e.section == section)
            .count();
        sections.push(SectionCount {
            section: section.name(),
            entries,
        });
    }

    SourceInventory {
        statements: source.statements().count(),
        interfaces: referenced_interfaces(&classification.entries),
        version: source.version,
        model: source.model,
        dialect: source.dialect,
        sections,
        rehomes: classification.rehomes,
        duplicates: classification.duplicates,
        unclassified: classification.unclassified,
    }
}

pub fn render_inventory(inv: &SourceInventory) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "version={} ({}) model={} ({}) dialect={:?} statements={}",
        inv.version.value,
        inv.version.source,
        inv.model.value,
        inv.model.source,
        inv.dialect,
        inv.statements
    ));
    out.push("sections".to_string());
    for row in &inv.sections {
        out.push(format!("- {}: {}", row.section, row.entries));
    }
    if !inv.interfaces.is_empty() {
        out.push(format!("interfaces {}", inv.interfaces.join(",")));
    }
    for rehome in &inv.rehomes {
        out.push(format!(
            "rehomed line {}: {} -> {} ({})",
            rehome.line_index, rehome.from, rehome.to, rehome.reason
        ));
    }
    for dup in &inv.duplicates {
        out.push(format!(
            "duplicate line {} of line {} in {}",
            dup.line_index, dup.kept_line, dup.section
        ));
    }
    if !inv.unclassified.is_empty() {
        let lines: Vec<String> = inv.unclassified.iter().map(ToString::to_string).collect();
        out.push(format!("unclassified lines {}", lines.join(",")));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{build_inventory, render_inventory};

    #[test]
    fn inventory_reports_detection_and_rehomes() {
        let text = "# jan/02/2024 by RouterOS 6.49.2\n# model = CCR1036-8G-2S+\n/ip address\nadd address=10.0.0.1/24 interface=ether1\nadd address=10.0.0.2/24 interface=ether2\n/routing bfd interface\nadd interface=ether1\nadd remote-address=192.0.2.1 remote-as=65001\n";
        let inv = build_inventory(text, None, None);
        assert_eq!(inv.version.value, "6.49.2");
        assert_eq!(inv.model.value, "CCR1036-8G-2S+");
        assert_eq!(inv.rehomes.len(), 1);
        assert_eq!(inv.interfaces, vec!["ether1".to_string(), "ether2".to_string()]);
        let text = render_inventory(&inv);
        assert!(text.contains("- ip-address: 2"));
        assert!(text.contains("rehomed line 8: routing-bfd -> bgp-connection"));
    }
}
