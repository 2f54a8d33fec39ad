use ros_config_core::statement::{Arg, Statement};

use crate::classify::Entry;
use crate::rules::DialectDefaults;
use crate::section::Section;

use super::position_of;

/// Routing tables must be declared before routes or mangle rules use them.
pub fn declare_routing_tables(entries: &mut Vec<Entry>, defaults: &DialectDefaults) {
    let mut wanted: Vec<String> = Vec::new();
    for entry in entries.iter() {
        let table = match entry.section {
            Section::IpRoute => entry
                .value("routing-table")
                .or_else(|| entry.value("routing-mark")),
            Section::FirewallMangle => entry.value("new-routing-mark"),
            _ => None,
        };
        if let Some(table) = table {
            if table != defaults.routing_table && !wanted.iter().any(|w| w == table) {
                wanted.push(table.to_string());
            }
        }
    }

    let declared: Vec<String> = entries
        .iter()
        .filter(|e| e.section == Section::RoutingTable)
        .filter_map(|e| e.value("name"))
        .map(str::to_string)
        .collect();

    let at = position_of(entries, |e| e.section == Section::IpRoute);
    for (offset, table) in wanted
        .into_iter()
        .filter(|t| !declared.contains(t))
        .enumerate()
    {
        let mut stmt = Statement::new("add");
        stmt.args.push(Arg {
            key: "fib".to_string(),
            value: None,
        });
        stmt.set("name", table);
        entries.insert(at + offset, Entry::new(0, Section::RoutingTable, stmt));
    }
}

#[cfg(test)]
mod tests {
    use super::declare_routing_tables;
    use crate::classify::Entry;
    use crate::rules::DialectDefaults;
    use crate::section::Section;
    use ros_config_core::Statement;

    fn entry(section: Section, text: &str) -> Entry {
        Entry::new(1, section, Statement::parse(text).expect("parse"))
    }

    #[test]
    fn declares_each_marked_table_once() {
        let mut entries = vec![
            entry(Section::FirewallMangle, "add action=mark-routing chain=prerouting new-routing-mark=via-isp2"),
            entry(Section::IpRoute, "add gateway=10.0.12.2"),
            entry(Section::IpRoute, "add gateway=10.0.13.2 routing-mark=via-isp2"),
        ];
        let defaults = DialectDefaults::default();
        declare_routing_tables(&mut entries, &defaults);
        declare_routing_tables(&mut entries, &defaults);
        let tables: Vec<_> = entries
            .iter()
            .filter(|e| e.section == Section::RoutingTable)
            .map(Entry::render)
            .collect();
        assert_eq!(tables, vec!["add fib name=via-isp2"]);
    }
}
