use tracing::warn;

use crate::classify::Entry;
use crate::section::Section;

use super::DroppedConstruct;

fn union_list(current: &str, extra: &str) -> String {
    let mut items: Vec<&str> = current.split(',').filter(|s| !s.is_empty()).collect();
    for item in extra.split(',').filter(|s| !s.is_empty()) {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items.join(",")
}

/// Collapse every LDP instance into the first one. The first value of each
/// key wins; transport addresses are unioned; conflicting values are
/// recorded as dropped.
pub fn merge_ldp_instances(entries: &mut Vec<Entry>, dropped: &mut Vec<DroppedConstruct>) {
    let positions: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.section == Section::MplsLdpInstance && e.statement.is_some())
        .map(|(pos, _)| pos)
        .collect();
    let Some((&first, rest)) = positions.split_first() else {
        return;
    };

    for &pos in &positions {
        if let Some(stmt) = entries[pos].statement.as_mut() {
            stmt.rename("transport-address", "transport-addresses");
        }
    }

    let Some(mut merged) = entries[first].statement.clone() else {
        return;
    };
    for &pos in rest {
        let other = &entries[pos];
        let Some(stmt) = other.statement.as_ref() else {
            continue;
        };
        for arg in &stmt.args {
            if arg.key == "transport-addresses" {
                let current = merged.get(&arg.key).unwrap_or_default().to_string();
                let extra = arg.value.as_deref().unwrap_or_default();
                merged.set(&arg.key, union_list(&current, extra));
            } else if !merged.has(&arg.key) {
                merged.args.push(arg.clone());
            } else if merged.get(&arg.key) != arg.value.as_deref() {
                let text = match &arg.value {
                    Some(value) => format!("{}={value}", arg.key),
                    None => arg.key.clone(),
                };
                warn!(line = other.line_index, arg = %text, "conflicting ldp setting dropped in merge");
                dropped.push(DroppedConstruct {
                    line_index: other.line_index,
                    section: Section::MplsLdpInstance,
                    text,
                    reason: "ldp instances merged".to_string(),
                });
            }
        }
    }

    if merged.remove("enabled").as_deref() == Some("no") {
        merged.set("disabled", "yes");
    }
    entries[first].statement = Some(merged);

    let mut pos = 0;
    entries.retain(|_| {
        let keep = !rest.contains(&pos);
        pos += 1;
        keep
    });
}
