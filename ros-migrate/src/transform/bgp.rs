use std::collections::HashMap;

use ros_config_core::statement::Statement;

use crate::classify::Entry;
use crate::rules::DialectDefaults;
use crate::section::Section;

const REDISTRIBUTE: &[(&str, &str)] = &[
    ("redistribute-connected", "connected"),
    ("redistribute-static", "static"),
    ("redistribute-rip", "rip"),
    ("redistribute-ospf", "ospf"),
    ("redistribute-other-bgp", "bgp"),
];

/// Legacy instance settings become template settings; `redistribute-*=yes`
/// flags fold into `output.redistribute`.
pub fn instance_to_template(entries: &mut [Entry]) {
    for entry in entries.iter_mut().filter(|e| e.section == Section::BgpTemplate) {
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        let mut redistribute = Vec::new();
        for (key, name) in REDISTRIBUTE {
            if let Some(value) = stmt.remove(key) {
                if value != "no" {
                    redistribute.push(*name);
                }
            }
        }
        if !redistribute.is_empty() {
            stmt.ensure("output.redistribute", redistribute.join(","));
        }
    }
}

/// Legacy `/routing bgp network` entries become members of the output
/// network address list.
pub fn networks_to_address_list(entries: &mut [Entry], defaults: &DialectDefaults) {
    for entry in entries.iter_mut().filter(|e| e.section == Section::BgpNetwork) {
        let Some(old) = entry.statement.as_ref() else {
            continue;
        };
        let Some(network) = old.get("network") else {
            continue;
        };
        let mut stmt = Statement::new("add");
        stmt.set("list", defaults.bgp_output_network.clone());
        stmt.set("address", network.to_string());
        stmt.args.extend(
            old.args
                .iter()
                .filter(|arg| arg.key != "network" && arg.key != "synchronize")
                .cloned(),
        );
        *entry = Entry::new(entry.line_index, Section::FirewallAddressList, stmt);
    }
}

fn template_as(entries: &[Entry]) -> HashMap<String, String> {
    entries
        .iter()
        .filter(|e| e.section == Section::BgpTemplate)
        .filter_map(|e| {
            let stmt = e.statement.as_ref()?;
            let name = stmt
                .value("name")
                .or_else(|| stmt.selector.as_deref().filter(|s| !s.starts_with('[')))?;
            Some((name.to_string(), stmt.value("as")?.to_string()))
        })
        .collect()
}

/// Every connection gets `local.role`: ibgp when its remote AS equals the
/// local AS (own `as=` or its template's), ebgp otherwise.
pub fn assign_local_role(entries: &mut [Entry], defaults: &DialectDefaults) {
    let templates = template_as(entries);
    for entry in entries.iter_mut().filter(|e| e.section == Section::BgpConnection) {
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        if stmt.verb != "add" || stmt.has("local.role") {
            continue;
        }
        let template = stmt
            .value("templates")
            .or_else(|| stmt.value("instance"))
            .unwrap_or(&defaults.bgp_template)
            .to_string();
        let local = stmt
            .value("as")
            .or_else(|| stmt.value("local.as"))
            .map(str::to_string)
            .or_else(|| templates.get(&template).cloned());
        let remote = stmt.value("remote.as").or_else(|| stmt.value("remote-as"));
        let role = match (local.as_deref(), remote) {
            (Some(local), Some(remote)) if local == remote => "ibgp",
            _ => "ebgp",
        };
        stmt.set("local.role", role);
    }
}

#[cfg(test)]
mod tests {
    use super::{assign_local_role, instance_to_template, networks_to_address_list};
    use crate::classify::Entry;
    use crate::rules::DialectDefaults;
    use crate::section::Section;
    use ros_config_core::Statement;

    fn entry(section: Section, text: &str) -> Entry {
        Entry::new(1, section, Statement::parse(text).expect("parse"))
    }

    #[test]
    fn instance_redistribution_folds() {
        let mut entries = vec![entry(
            Section::BgpTemplate,
            "set default as=65001 redistribute-connected=yes redistribute-static=yes redistribute-ospf=no router-id=10.255.0.1",
        )];
        instance_to_template(&mut entries);
        assert_eq!(
            entries[0].render(),
            "set default as=65001 router-id=10.255.0.1 output.redistribute=connected,static"
        );
    }

    #[test]
    fn networks_move_to_address_list() {
        let mut entries = vec![entry(
            Section::BgpNetwork,
            "add network=192.168.10.0/24 synchronize=no",
        )];
        networks_to_address_list(&mut entries, &DialectDefaults::default());
        assert_eq!(entries[0].section, Section::FirewallAddressList);
        assert_eq!(
            entries[0].render(),
            "add list=bgp-networks address=192.168.10.0/24"
        );
    }

    #[test]
    fn local_role_follows_template_as() {
        let mut entries = vec![
            entry(Section::BgpTemplate, "set default as=65001"),
            entry(Section::BgpConnection, "add name=isp1 remote-address=203.0.113.1 remote-as=65002"),
            entry(Section::BgpConnection, "add name=rr1 remote.address=10.255.0.9 remote.as=65001"),
            entry(Section::BgpConnection, "add name=x remote.as=65001 local.role=ebgp"),
        ];
        assign_local_role(&mut entries, &DialectDefaults::default());
        assert_eq!(entries[1].value("local.role"), Some("ebgp"));
        assert_eq!(entries[2].value("local.role"), Some("ibgp"));
        assert_eq!(entries[3].value("local.role"), Some("ebgp"));
    }
}
