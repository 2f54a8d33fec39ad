use std::collections::{HashMap, HashSet};

use ipnetwork::Ipv4Network;
use ros_config_core::statement::{Arg, Statement};
use tracing::warn;

use crate::classify::Entry;
use crate::rules::DialectDefaults;
use crate::section::Section;

use super::{position_of, DroppedConstruct};

const LEGACY_BACKBONE: &str = "backbone";

const REDISTRIBUTE: &[(&str, &str)] = &[
    ("redistribute-connected", "connected"),
    ("redistribute-static", "static"),
    ("redistribute-rip", "rip"),
    ("redistribute-bgp", "bgp"),
    ("redistribute-other-ospf", "ospf"),
];

struct LegacyNetwork {
    pos: usize,
    raw: String,
    net: Ipv4Network,
    area: String,
    /// Only `network`, `area` and `disabled=no`; anything else keeps its own template.
    plain: bool,
}

fn is_plain_network(stmt: &Statement) -> bool {
    stmt.verb == "add"
        && stmt.args.iter().all(|arg| match arg.key.as_str() {
            "network" | "area" => true,
            "disabled" => arg.value.as_deref() == Some("no"),
            _ => false,
        })
}

/// Subnets configured on each interface, from `/ip address`.
fn interface_subnets(entries: &[Entry]) -> HashMap<String, Vec<Ipv4Network>> {
    let mut subnets: HashMap<String, Vec<Ipv4Network>> = HashMap::new();
    for entry in entries.iter().filter(|e| e.section == Section::IpAddress) {
        let (Some(addr), Some(iface)) = (entry.value("address"), entry.value("interface")) else {
            continue;
        };
        if let Ok(net) = addr.parse::<Ipv4Network>() {
            subnets.entry(iface.to_string()).or_default().push(net);
        }
    }
    subnets
}

/// Fold legacy `/routing ospf interface` and `/routing ospf network` entries
/// into interface templates. Networks carrying more than `network` and `area`
/// become templates of their own with every argument kept.
pub fn split_legacy(entries: &mut Vec<Entry>, _defaults: &DialectDefaults) {
    let networks: Vec<LegacyNetwork> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.section == Section::OspfNetwork)
        .filter_map(|(pos, e)| {
            let raw = e.value("network")?.to_string();
            let net = raw.parse().ok()?;
            Some(LegacyNetwork {
                pos,
                raw,
                net,
                area: e.value("area").unwrap_or(LEGACY_BACKBONE).to_string(),
                plain: e.statement.as_ref().is_some_and(is_plain_network),
            })
        })
        .collect();
    let subnets = interface_subnets(entries);
    let mut consumed: HashSet<usize> = HashSet::new();

    for entry in entries.iter_mut() {
        if entry.section != Section::OspfInterfaceTemplate {
            continue;
        }
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        let Some(iface) = stmt.value("interface").map(str::to_string) else {
            continue;
        };

        let addresses = subnets.get(&iface).cloned().unwrap_or_default();
        let matching: Vec<&LegacyNetwork> = networks
            .iter()
            .filter(|n| n.plain && addresses.iter().any(|a| n.net.contains(a.ip())))
            .collect();
        let area = stmt
            .value("area")
            .map(str::to_string)
            .or_else(|| matching.first().map(|n| n.area.clone()))
            .unwrap_or_else(|| LEGACY_BACKBONE.to_string());
        let folded: Vec<&LegacyNetwork> = matching.into_iter().filter(|n| n.area == area).collect();

        stmt.rename("interface", "interfaces");
        stmt.ensure("area", area);
        if !folded.is_empty() {
            let joined = folded.iter().map(|n| n.raw.as_str()).collect::<Vec<_>>().join(",");
            stmt.ensure("networks", joined);
            consumed.extend(folded.iter().map(|n| n.pos));
        }
    }

    for network in &networks {
        if consumed.contains(&network.pos) {
            continue;
        }
        let entry = &mut entries[network.pos];
        let mut stmt = Statement::new("add");
        stmt.set("area", network.area.clone());
        stmt.set("networks", network.raw.clone());
        if let Some(old) = entry.statement.as_ref() {
            stmt.args.extend(
                old.args
                    .iter()
                    .filter(|arg| arg.key != "network" && arg.key != "area")
                    .cloned(),
            );
        }
        *entry = Entry::new(entry.line_index, Section::OspfInterfaceTemplate, stmt);
    }

    let mut pos = 0;
    entries.retain(|_| {
        let keep = !consumed.contains(&pos);
        pos += 1;
        keep
    });
}

fn is_default_selector(stmt: &Statement) -> bool {
    stmt.selector_value("default") == Some("yes") || stmt.selector.as_deref() == Some("default")
}

fn prepend(stmt: &mut Statement, key: &str, value: &str) {
    if stmt.has(key) {
        return;
    }
    stmt.args.insert(
        0,
        Arg {
            key: key.to_string(),
            value: Some(value.to_string()),
        },
    );
}

fn convert_instance(stmt: &mut Statement, defaults: &DialectDefaults) -> Vec<String> {
    let mut removed = Vec::new();
    if stmt.verb == "set" && is_default_selector(stmt) {
        stmt.verb = "add".to_string();
        stmt.selector = None;
        prepend(stmt, "name", &defaults.ospf_instance);
    }

    let mut redistribute = Vec::new();
    for (key, name) in REDISTRIBUTE {
        if let Some(value) = stmt.remove(key) {
            if value != "no" {
                redistribute.push(*name);
            }
        }
    }
    if !redistribute.is_empty() {
        stmt.ensure("redistribute", redistribute.join(","));
    }

    if let Some(value) = stmt.remove("distribute-default") {
        let originate = match value.as_str() {
            v if v.starts_with("if-installed") => Some("if-installed"),
            v if v.starts_with("always") => Some("always"),
            _ => None,
        };
        match originate {
            Some(originate) => {
                stmt.ensure("originate-default", originate);
            }
            None => removed.push(format!("distribute-default={value}")),
        }
    }

    let metrics: Vec<String> = stmt
        .args
        .iter()
        .filter(|arg| arg.key.starts_with("metric-"))
        .map(|arg| arg.key.clone())
        .collect();
    for key in metrics {
        match stmt.remove(&key) {
            Some(value) => removed.push(format!("{key}={value}")),
            None => removed.push(key),
        }
    }
    removed
}

/// Give OSPF a named instance, attach areas to it and rename the backbone.
/// Companion entries are synthesized only when OSPF is already configured.
/// Instance arguments with no modern counterpart are recorded in `dropped`.
pub fn normalize_instance_area(
    entries: &mut Vec<Entry>,
    defaults: &DialectDefaults,
    dropped: &mut Vec<DroppedConstruct>,
) {
    if !entries.iter().any(|e| e.section.is_ospf()) {
        return;
    }

    for entry in entries.iter_mut().filter(|e| e.section == Section::OspfInstance) {
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        for text in convert_instance(stmt, defaults) {
            warn!(line = entry.line_index, arg = %text, "ospf instance setting dropped");
            dropped.push(DroppedConstruct {
                line_index: entry.line_index,
                section: Section::OspfInstance,
                text,
                reason: "ospf-instance-no-equivalent".to_string(),
            });
        }
    }
    let legacy_default_taken = entries.iter().any(|e| {
        e.section == Section::OspfInstance && e.value("name") == Some("default")
    });

    for entry in entries.iter_mut() {
        let section = entry.section.clone();
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        match section {
            Section::OspfArea => {
                if stmt.verb == "set" && is_default_selector(stmt) {
                    stmt.verb = "add".to_string();
                    stmt.selector = None;
                    prepend(stmt, "name", &defaults.ospf_backbone_area);
                    stmt.ensure("area-id", "0.0.0.0");
                }
                if stmt.value("name") == Some(LEGACY_BACKBONE) {
                    stmt.set("name", defaults.ospf_backbone_area.clone());
                }
                if stmt.value("instance") == Some("default") && !legacy_default_taken {
                    stmt.set("instance", defaults.ospf_instance.clone());
                }
                stmt.ensure("instance", defaults.ospf_instance.clone());
            }
            Section::OspfInterfaceTemplate => {
                if stmt.value("area") == Some(LEGACY_BACKBONE) {
                    stmt.set("area", defaults.ospf_backbone_area.clone());
                }
            }
            _ => {}
        }
    }

    let first_ospf = position_of(entries, |e| e.section.is_ospf());
    if !entries.iter().any(|e| e.section == Section::OspfInstance) {
        let mut stmt = Statement::new("add");
        stmt.set("name", defaults.ospf_instance.clone());
        entries.insert(first_ospf, Entry::new(0, Section::OspfInstance, stmt));
    }

    let backbone = defaults.ospf_backbone_area.as_str();
    let referenced = entries.iter().any(|e| {
        e.section == Section::OspfInterfaceTemplate && e.value("area") == Some(backbone)
    });
    let defined = entries
        .iter()
        .any(|e| e.section == Section::OspfArea && e.value("name") == Some(backbone));
    if referenced && !defined {
        let mut stmt = Statement::new("add");
        stmt.set("name", backbone);
        stmt.set("area-id", "0.0.0.0");
        stmt.set("instance", defaults.ospf_instance.clone());
        let at = position_of(entries, |e| {
            matches!(e.section, Section::OspfArea | Section::OspfInterfaceTemplate)
        });
        entries.insert(at, Entry::new(0, Section::OspfArea, stmt));
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_instance_area, split_legacy};
    use crate::classify::Entry;
    use crate::rules::DialectDefaults;
    use crate::section::Section;
    use ros_config_core::Statement;

    fn entry(section: Section, text: &str) -> Entry {
        Entry::new(1, section, Statement::parse(text).expect("parse"))
    }

    fn rendered(entries: &[Entry], section: Section) -> Vec<String> {
        entries
            .iter()
            .filter(|e| e.section == section)
            .map(Entry::render)
            .collect()
    }

    #[test]
    fn legacy_interface_folds_matching_network() {
        let mut entries = vec![
            entry(Section::IpAddress, "add address=10.0.12.1/30 interface=ether2"),
            entry(Section::OspfInterfaceTemplate, "add interface=ether2 network-type=point-to-point"),
            entry(Section::OspfNetwork, "add area=backbone network=10.0.12.0/30"),
            entry(Section::OspfNetwork, "add area=area1 network=172.16.100.0/24"),
        ];
        split_legacy(&mut entries, &DialectDefaults::default());
        assert_eq!(
            rendered(&entries, Section::OspfInterfaceTemplate),
            vec![
                "add interfaces=ether2 network-type=point-to-point area=backbone networks=10.0.12.0/30",
                "add area=area1 networks=172.16.100.0/24",
            ]
        );
        assert!(rendered(&entries, Section::OspfNetwork).is_empty());
    }

    #[test]
    fn interface_without_network_defaults_to_backbone() {
        let mut entries = vec![entry(
            Section::OspfInterfaceTemplate,
            "add interface=ether1 network-type=point-to-point",
        )];
        let defaults = DialectDefaults::default();
        split_legacy(&mut entries, &defaults);
        normalize_instance_area(&mut entries, &defaults, &mut Vec::new());
        assert_eq!(rendered(&entries, Section::OspfInstance), vec!["add name=default-v2"]);
        assert_eq!(
            rendered(&entries, Section::OspfArea),
            vec!["add name=backbone-v2 area-id=0.0.0.0 instance=default-v2"]
        );
        assert_eq!(
            rendered(&entries, Section::OspfInterfaceTemplate),
            vec!["add interfaces=ether1 network-type=point-to-point area=backbone-v2"]
        );
    }

    #[test]
    fn default_instance_folds_redistribution() {
        let mut entries = vec![
            entry(
                Section::OspfInstance,
                "set [ find default=yes ] redistribute-connected=as-type-1 redistribute-static=no router-id=10.255.0.1",
            ),
            entry(Section::OspfArea, "add area-id=0.0.0.1 name=area1"),
        ];
        normalize_instance_area(&mut entries, &DialectDefaults::default(), &mut Vec::new());
        assert_eq!(
            rendered(&entries, Section::OspfInstance),
            vec!["add name=default-v2 router-id=10.255.0.1 redistribute=connected"]
        );
        assert_eq!(
            rendered(&entries, Section::OspfArea),
            vec!["add area-id=0.0.0.1 name=area1 instance=default-v2"]
        );
    }

    #[test]
    fn annotated_network_keeps_its_own_template() {
        let mut entries = vec![
            entry(Section::IpAddress, "add address=10.0.12.1/30 interface=ether2"),
            entry(Section::OspfInterfaceTemplate, "add interface=ether2"),
            entry(
                Section::OspfNetwork,
                "add area=backbone comment=\"to core 10.9.9.9\" network=10.0.12.0/30",
            ),
        ];
        split_legacy(&mut entries, &DialectDefaults::default());
        assert_eq!(
            rendered(&entries, Section::OspfInterfaceTemplate),
            vec![
                "add interfaces=ether2 area=backbone",
                "add area=backbone networks=10.0.12.0/30 comment=\"to core 10.9.9.9\"",
            ]
        );
    }

    #[test]
    fn disabled_network_is_never_folded() {
        let mut entries = vec![
            entry(Section::IpAddress, "add address=10.0.12.1/30 interface=ether2"),
            entry(Section::OspfInterfaceTemplate, "add interface=ether2"),
            entry(Section::OspfNetwork, "add area=backbone disabled=yes network=10.0.12.0/30"),
        ];
        split_legacy(&mut entries, &DialectDefaults::default());
        let templates = rendered(&entries, Section::OspfInterfaceTemplate);
        assert_eq!(templates[0], "add interfaces=ether2 area=backbone");
        assert_eq!(templates[1], "add area=backbone networks=10.0.12.0/30 disabled=yes");
    }

    #[test]
    fn instance_settings_without_equivalent_are_recorded() {
        let mut entries = vec![entry(
            Section::OspfInstance,
            "set [ find default=yes ] distribute-default=never metric-static=20 router-id=10.255.0.1",
        )];
        let mut dropped = Vec::new();
        normalize_instance_area(&mut entries, &DialectDefaults::default(), &mut dropped);
        assert_eq!(
            rendered(&entries, Section::OspfInstance),
            vec!["add name=default-v2 router-id=10.255.0.1"]
        );
        let texts: Vec<&str> = dropped.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["distribute-default=never", "metric-static=20"]);
        assert!(dropped.iter().all(|d| d.section == Section::OspfInstance));
    }

    #[test]
    fn nothing_is_synthesized_without_ospf() {
        let mut entries = vec![entry(Section::IpAddress, "add address=10.0.0.1/24 interface=ether1")];
        normalize_instance_area(&mut entries, &DialectDefaults::default(), &mut Vec::new());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn passes_are_idempotent() {
        let mut entries = vec![
            entry(Section::IpAddress, "add address=10.0.12.1/30 interface=ether2"),
            entry(Section::OspfInstance, "set [ find default=yes ] router-id=1.1.1.1"),
            entry(Section::OspfInterfaceTemplate, "add interface=ether2"),
            entry(Section::OspfNetwork, "add area=backbone network=10.0.12.0/30"),
        ];
        let defaults = DialectDefaults::default();
        split_legacy(&mut entries, &defaults);
        normalize_instance_area(&mut entries, &defaults, &mut Vec::new());
        let once = entries.clone();
        split_legacy(&mut entries, &defaults);
        normalize_instance_area(&mut entries, &defaults, &mut Vec::new());
        assert_eq!(once, entries);
    }
}
