use std::collections::HashSet;

use crate::classify::Entry;
use crate::section::Section;

/// Bridges carrying tagged traffic get `vlan-filtering=yes`.
pub fn enable_vlan_filtering(entries: &mut [Entry]) {
    let bridges: HashSet<String> = entries
        .iter()
        .filter(|e| e.section == Section::InterfaceBridge && e.verb() == Some("add"))
        .filter_map(|e| e.value("name"))
        .map(str::to_string)
        .collect();
    if bridges.is_empty() {
        return;
    }

    let mut tagged: HashSet<String> = HashSet::new();
    for entry in entries.iter() {
        let name = match entry.section {
            Section::InterfaceBridgeVlan => entry.value("bridge"),
            Section::InterfaceVlan => entry.value("interface"),
            _ => None,
        };
        if let Some(name) = name.filter(|n| bridges.contains(*n)) {
            tagged.insert(name.to_string());
        }
    }

    for entry in entries
        .iter_mut()
        .filter(|e| e.section == Section::InterfaceBridge)
    {
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        let carries_tags = stmt.value("name").is_some_and(|n| tagged.contains(n));
        if stmt.verb == "add" && carries_tags && stmt.value("vlan-filtering") != Some("yes") {
            stmt.set("vlan-filtering", "yes");
        }
    }
}
