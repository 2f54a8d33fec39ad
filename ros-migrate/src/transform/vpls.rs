use std::collections::HashSet;

use crate::classify::Entry;
use crate::rules::DialectDefaults;
use crate::section::Section;

/// `cisco-static-id` for an entry: explicit, from `vpls-id=A:B`, else the
/// digits of its name.
fn derive_static_id(vpls_id: Option<&str>, name: Option<&str>) -> Option<String> {
    if let Some(id) = vpls_id.and_then(|v| v.rsplit_once(':')).map(|(_, b)| b) {
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            return Some(id.to_string());
        }
    }
    let digits: String = name?.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Bring VPLS entries to the canonical form: static id, pseudowire MTU.
pub fn canonicalize(entries: &mut [Entry], defaults: &DialectDefaults) {
    let mut used: HashSet<String> = entries
        .iter()
        .filter(|e| e.section == Section::InterfaceVpls)
        .filter_map(|e| e.value("cisco-static-id").or_else(|| e.value("cisco-style-id")))
        .map(str::to_string)
        .collect();
    let mut next_free = 1u32;

    for entry in entries.iter_mut().filter(|e| e.section == Section::InterfaceVpls) {
        let Some(stmt) = entry.statement.as_mut() else {
            continue;
        };
        if stmt.verb != "add" {
            continue;
        }

        stmt.rename("cisco-style-id", "cisco-static-id");
        if !stmt.has("cisco-static-id") {
            let derived = derive_static_id(stmt.value("vpls-id"), stmt.value("name"))
                .filter(|id| !used.contains(id))
                .unwrap_or_else(|| {
                    while used.contains(&next_free.to_string()) {
                        next_free += 1;
                    }
                    next_free.to_string()
                });
            used.insert(derived.clone());
            stmt.set("cisco-static-id", derived);
        }
        stmt.remove("vpls-id");

        stmt.rename("l2mtu", "pw-l2mtu");
        stmt.rename("advertised-l2mtu", "pw-l2mtu");
        stmt.ensure("pw-l2mtu", defaults.vpls_pw_l2mtu.to_string());
    }
}
