//! Physical port mapping between device layouts.

use std::collections::{HashMap, HashSet, VecDeque};

use ros_config_core::statement::{unquote, Statement};
use serde::Serialize;

use crate::classify::Entry;
use crate::devices::DeviceProfile;
use crate::section::Section;

/// Keys whose values name interfaces (possibly comma separated).
pub const INTERFACE_KEYS: &[&str] = &[
    "interface",
    "interfaces",
    "slaves",
    "in-interface",
    "out-interface",
    "tagged",
    "untagged",
    "master-port",
    "primary",
    "default-name",
    "ports",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortClass {
    Ethernet,
    Sfp,
    Qsfp,
}

impl PortClass {
    const ALL: [PortClass; 3] = [PortClass::Ethernet, PortClass::Sfp, PortClass::Qsfp];

    /// Classes a reference may spill into when the target has no data port
    /// of its own class at all.
    fn spill(self) -> &'static [PortClass] {
        match self {
            PortClass::Ethernet => &[PortClass::Sfp, PortClass::Qsfp],
            PortClass::Sfp => &[PortClass::Qsfp],
            PortClass::Qsfp => &[],
        }
    }
}

/// A port name split into prefix and trailing index: `sfp28-12` → `sfp28-` / 12.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortName {
    pub prefix: String,
    pub index: u32,
}

impl PortName {
    pub fn parse(name: &str) -> Option<PortName> {
        let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 || digits == name.len() {
            return None;
        }
        let (prefix, index) = name.split_at(name.len() - digits);
        Some(PortName {
            prefix: prefix.to_string(),
            index: index.parse().ok()?,
        })
    }

    /// Naming family with any breakout group removed: `qsfp28-1-` → `qsfp28-`.
    pub fn family(&self) -> &str {
        let Some(trimmed) = self.prefix.strip_suffix('-') else {
            return &self.prefix;
        };
        let base = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());
        if base.len() < trimmed.len() && base.ends_with('-') {
            base
        } else {
            &self.prefix
        }
    }

    /// `None` for logical interfaces such as `vlan100` or `bond1`.
    pub fn class(&self) -> Option<PortClass> {
        let prefix = self.prefix.to_ascii_lowercase();
        if prefix.starts_with("ether") || prefix.starts_with("combo") {
            Some(PortClass::Ethernet)
        } else if prefix.starts_with("qsfp") {
            Some(PortClass::Qsfp)
        } else if prefix.starts_with("sfp") {
            Some(PortClass::Sfp)
        } else {
            None
        }
    }
}

fn physical_class(name: &str) -> Option<PortClass> {
    PortName::parse(name).and_then(|p| p.class())
}

/// Ordered physical ports of one device plus its management port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLayout {
    pub ports: Vec<String>,
    pub management: Option<String>,
}

impl PortLayout {
    /// Layout for an unknown device, built from the ports a config references.
    /// Only a referenced `ether1` is taken as the management port.
    pub fn from_referenced(referenced: &[String]) -> Self {
        let mut ports: Vec<String> = referenced
            .iter()
            .filter(|name| physical_class(name).is_some())
            .cloned()
            .collect();
        ports.sort_by_key(|name| {
            let port = PortName::parse(name);
            (port.as_ref().and_then(PortName::class), port)
        });
        ports.dedup();
        let management = ports.iter().find(|p| p.as_str() == "ether1").cloned();
        Self { ports, management }
    }

    fn position(&self, name: &str) -> usize {
        self.ports
            .iter()
            .position(|p| p == name)
            .unwrap_or(self.ports.len())
    }
}

impl From<&DeviceProfile> for PortLayout {
    fn from(profile: &DeviceProfile) -> Self {
        Self {
            ports: profile.port_names(),
            management: profile.management_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignMethod {
    Identity,
    Management,
    Ordinal,
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceAssignment {
    pub source: String,
    pub target: String,
    pub method: AssignMethod,
}

/// Total mapping over every referenced physical interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceMapping {
    pub entries: Vec<InterfaceAssignment>,
    /// References that found no free port of their class; mapped to themselves.
    pub unmapped: Vec<String>,
}

impl InterfaceMapping {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.source == name)
            .map(|e| e.target.as_str())
    }

    pub fn is_identity(&self) -> bool {
        self.entries.iter().all(|e| e.source == e.target)
    }

    fn map_name(&self, name: &str) -> String {
        let (negated, bare) = match name.strip_prefix('!') {
            Some(bare) => (true, bare),
            None => (false, name),
        };
        let mapped = self.get(bare).unwrap_or(bare);
        if negated {
            format!("!{mapped}")
        } else {
            mapped.to_string()
        }
    }

    fn map_list(&self, raw: &str) -> String {
        let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
        let mapped = unquote(raw)
            .split(',')
            .map(|name| self.map_name(name.trim()))
            .collect::<Vec<_>>()
            .join(",");
        if quoted {
            format!("\"{mapped}\"")
        } else {
            mapped
        }
    }

    /// Rewrite interface references of one statement. Returns whether
    /// anything changed.
    pub fn apply(&self, section: &Section, stmt: &mut Statement) -> bool {
        if self.is_identity() {
            return false;
        }
        let mut changed = false;
        for arg in stmt.args.iter_mut() {
            let bears_interface = INTERFACE_KEYS.contains(&arg.key.as_str())
                || (*section == Section::InterfaceEthernet && arg.key == "name");
            if !bears_interface {
                continue;
            }
            if let Some(value) = arg.value.as_mut() {
                let mapped = self.map_list(value);
                if mapped != *value {
                    *value = mapped;
                    changed = true;
                }
            }
        }

        if let Some(selector) = stmt.selector.clone() {
            let mapped = if selector.starts_with('[') {
                stmt.selector_value("default-name").and_then(|old| {
                    self.get(old).filter(|new| *new != old).map(|new| {
                        selector.replace(
                            &format!("default-name={old}"),
                            &format!("default-name={new}"),
                        )
                    })
                })
            } else {
                self.get(&selector)
                    .filter(|new| *new != selector)
                    .map(str::to_string)
            };
            if let Some(mapped) = mapped {
                stmt.selector = Some(mapped);
                changed = true;
            }
        }
        changed
    }
}

/// Physical interfaces referenced anywhere in `entries`, in first-use order.
pub fn referenced_interfaces(entries: &[Entry]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim().trim_start_matches('!');
        if physical_class(name).is_some() && seen.insert(name.to_string()) {
            found.push(name.to_string());
        }
    };

    for entry in entries {
        let Some(stmt) = entry.statement.as_ref() else {
            continue;
        };
        if let Some(name) = stmt.selector_value("default-name") {
            push(name);
        } else if let Some(selector) = stmt.selector.as_deref() {
            if entry.section == Section::InterfaceEthernet {
                push(selector);
            }
        }
        for arg in &stmt.args {
            if !INTERFACE_KEYS.contains(&arg.key.as_str()) {
                continue;
            }
            if let Some(value) = arg.value.as_deref() {
                unquote(value).split(',').for_each(&mut push);
            }
        }
    }
    found
}

/// Physical slave lists of every bonding interface.
pub fn bond_groups(entries: &[Entry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .filter(|e| e.section == Section::InterfaceBonding)
        .filter_map(|e| e.value("slaves"))
        .map(|slaves| {
            slaves
                .split(',')
                .map(str::trim)
                .filter(|s| physical_class(s).is_some())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|group| group.len() > 1)
        .collect()
}

/// Build the mapping from `source` to `target` for the `referenced` ports.
pub fn build_mapping(
    source: &PortLayout,
    target: &PortLayout,
    referenced: &[String],
    bonds: &[Vec<String>],
) -> InterfaceMapping {
    let referenced: Vec<&String> = referenced
        .iter()
        .filter(|name| physical_class(name).is_some())
        .collect();
    let mut assigned: HashMap<String, (String, AssignMethod)> = HashMap::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for name in &referenced {
        if target.ports.contains(name) {
            assigned.insert((*name).clone(), ((*name).clone(), AssignMethod::Identity));
            claimed.insert((*name).clone());
        }
    }

    if let (Some(src), Some(dst)) = (&source.management, &target.management) {
        let pending = referenced.iter().any(|r| *r == src) && !assigned.contains_key(src);
        if pending && !claimed.contains(dst) {
            assigned.insert(src.clone(), (dst.clone(), AssignMethod::Management));
            claimed.insert(dst.clone());
        }
    }

    let pending = ordinal_order(
        source,
        referenced
            .iter()
            .filter(|name| !assigned.contains_key(**name))
            .map(|name| (*name).clone())
            .collect(),
        bonds,
    );

    let mut free: HashMap<PortClass, VecDeque<String>> = HashMap::new();
    let mut has_data_ports: HashSet<PortClass> = HashSet::new();
    for port in &target.ports {
        if Some(port) == target.management.as_ref() {
            continue;
        }
        let Some(class) = physical_class(port) else {
            continue;
        };
        has_data_ports.insert(class);
        if !claimed.contains(port) {
            free.entry(class).or_default().push_back(port.clone());
        }
    }

    let mut leftovers = Vec::new();
    for class in PortClass::ALL {
        for name in pending.iter().filter(|n| physical_class(n) == Some(class)) {
            match free.get_mut(&class).and_then(VecDeque::pop_front) {
                Some(port) => {
                    assigned.insert(name.clone(), (port, AssignMethod::Ordinal));
                }
                None => leftovers.push((name.clone(), class)),
            }
        }
    }
    leftovers.sort_by_key(|(name, _)| pending.iter().position(|p| p == name));

    let mut unmapped = Vec::new();
    for (name, class) in leftovers {
        let spilled = if has_data_ports.contains(&class) {
            None
        } else {
            class
                .spill()
                .iter()
                .find_map(|other| free.get_mut(other).and_then(VecDeque::pop_front))
        };
        match spilled {
            Some(port) => {
                assigned.insert(name, (port, AssignMethod::Ordinal));
            }
            None => {
                assigned.insert(name.clone(), (name.clone(), AssignMethod::Unmapped));
                unmapped.push(name);
            }
        }
    }

    let entries = referenced
        .iter()
        .filter_map(|name| {
            assigned.get(*name).map(|(target, method)| InterfaceAssignment {
                source: (*name).clone(),
                target: target.clone(),
                method: *method,
            })
        })
        .collect();
    let unmapped = referenced
        .iter()
        .filter(|name| unmapped.contains(name))
        .map(|name| (*name).clone())
        .collect();

    InterfaceMapping { entries, unmapped }
}

/// Source port order with each bond's slaves pulled together at the slot of
/// the first member.
fn ordinal_order(source: &PortLayout, mut pending: Vec<String>, bonds: &[Vec<String>]) -> Vec<String> {
    pending.sort_by_key(|name| (source.position(name), PortName::parse(name)));
    let mut ordered: Vec<String> = Vec::with_capacity(pending.len());
    for name in &pending {
        if ordered.contains(name) {
            continue;
        }
        match bonds.iter().find(|group| group.contains(name)) {
            Some(group) => {
                for member in group {
                    if pending.contains(member) && !ordered.contains(member) {
                        ordered.push(member.clone());
                    }
                }
            }
            None => ordered.push(name.clone()),
        }
    }
    ordered
}
