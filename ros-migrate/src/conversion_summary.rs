use serde::Serialize;

use crate::classify::classify;
use crate::section::Section;
use crate::source::tokenize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub sections: usize,
    pub interfaces: usize,
    pub addresses: usize,
    pub firewall_rules: usize,
    pub routes: usize,
    pub bgp_connections: usize,
    pub ospf_templates: usize,
    pub vpls: usize,
    pub users: usize,
}

/// Count the main object kinds in an output config.
pub fn summarize(config: &str) -> ConversionSummary {
    let classification = classify(&tokenize(config, None, None));
    let mut summary = ConversionSummary {
        sections: classification.sections().len(),
        ..Default::default()
    };
    for entry in &classification.entries {
        if entry.verb() != Some("add") {
            continue;
        }
        let counter = match &entry.section {
            Section::InterfaceBridge | Section::InterfaceBonding | Section::InterfaceVlan => {
                &mut summary.interfaces
            }
            Section::IpAddress => &mut summary.addresses,
            section if section.is_firewall_rules() => &mut summary.firewall_rules,
            Section::IpRoute => &mut summary.routes,
            Section::BgpConnection => &mut summary.bgp_connections,
            Section::OspfInterfaceTemplate => &mut summary.ospf_templates,
            Section::InterfaceVpls => &mut summary.vpls,
            Section::User | Section::PppSecret => &mut summary.users,
            _ => continue,
        };
        *counter += 1;
    }
    summary
}

pub fn render(summary: ConversionSummary) -> String {
    format!(
        "convert_summary sections={} interfaces={} addresses={} firewall_rules={} routes={} bgp={} ospf={} vpls={} users={}",
        summary.sections,
        summary.interfaces,
        summary.addresses,
        summary.firewall_rules,
        summary.routes,
        summary.bgp_connections,
        summary.ospf_templates,
        summary.vpls,
        summary.users
    )
}
