//! Section assignment, re-homing of misplaced protocol lines and semantic
//! deduplication.

use std::collections::{BTreeSet, HashMap};

use ros_config_core::statement::Statement;
use serde::Serialize;
use tracing::debug;

use crate::extract::{ipv4_hosts, secret_values};
use crate::section::Section;
use crate::source::{ConfigLine, SourceConfig};

/// A statement assigned to a section; the unit every later stage works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Source line this entry came from (0 for synthesized entries).
    pub line_index: usize,
    pub section: Section,
    /// Statement text as written, used when `statement` is `None`.
    pub text: String,
    pub statement: Option<Statement>,
}

impl Entry {
    pub fn new(line_index: usize, section: Section, statement: Statement) -> Self {
        Self {
            line_index,
            section,
            text: statement.to_string(),
            statement: Some(statement),
        }
    }

    /// Rendered statement text.
    pub fn render(&self) -> String {
        match &self.statement {
            Some(stmt) => stmt.to_string(),
            None => self.text.clone(),
        }
    }

    pub fn verb(&self) -> Option<&str> {
        self.statement.as_ref().map(|s| s.verb.as_str())
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.statement.as_ref().and_then(|s| s.value(key))
    }

    pub fn has(&self, key: &str) -> bool {
        match &self.statement {
            Some(stmt) => stmt.has(key),
            None => self.text.contains(&format!("{key}=")),
        }
    }
}

/// A line moved out of the section its header implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rehome {
    pub line_index: usize,
    pub from: Section,
    pub to: Section,
    pub reason: &'static str,
}

/// A statement dropped as a semantic duplicate of an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub line_index: usize,
    pub kept_line: usize,
    pub section: Section,
    pub key: String,
}

/// Classifier output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    pub entries: Vec<Entry>,
    pub rehomes: Vec<Rehome>,
    pub duplicates: Vec<Duplicate>,
    /// Line numbers of statements that landed in `Unassigned`.
    pub unclassified: Vec<usize>,
}

impl Classification {
    pub fn sections(&self) -> BTreeSet<Section> {
        self.entries.iter().map(|e| e.section.clone()).collect()
    }

    pub fn has_section(&self, section: &Section) -> bool {
        self.entries.iter().any(|e| &e.section == section)
    }
}

/// Header state carried across lines.
#[derive(Debug, Clone, Default)]
pub struct ActiveSection {
    path: Option<String>,
    section: Option<Section>,
}

/// Classify one line given the active header. Headers update `active`.
pub fn classify_line(line: &ConfigLine, active: &mut ActiveSection) -> (Section, Option<Rehome>) {
    if line.is_header() {
        active.path = line.path.clone();
        active.section = Some(line.section.clone());
        return (line.section.clone(), None);
    }

    let base = if line.path.is_some() && line.path != active.path {
        Some(line.section.clone())
    } else {
        active.section.clone()
    };

    let Some(stmt) = line.statement.as_ref() else {
        return (base.unwrap_or(Section::Unassigned), None);
    };

    let Some(base) = base else {
        return (infer_section(stmt).unwrap_or(Section::Unassigned), None);
    };

    match rehome_target(&base, stmt) {
        Some((to, reason)) => {
            let rehome = Rehome {
                line_index: line.line_index,
                from: base,
                to: to.clone(),
                reason,
            };
            (to, Some(rehome))
        }
        None => (base, None),
    }
}

/// Classify every statement of `source` and deduplicate the result.
pub fn classify(source: &SourceConfig) -> Classification {
    let mut active = ActiveSection::default();
    let mut entries = Vec::new();
    let mut rehomes = Vec::new();

    for line in &source.lines {
        let (section, rehome) = classify_line(line, &mut active);
        if line.is_header() {
            continue;
        }
        if let Some(rehome) = rehome {
            debug!(
                line = rehome.line_index,
                from = %rehome.from,
                to = %rehome.to,
                reason = rehome.reason,
                "re-homed misplaced line"
            );
            rehomes.push(rehome);
        }
        entries.push(Entry {
            line_index: line.line_index,
            section,
            text: line.text.clone(),
            statement: line.statement.clone(),
        });
    }

    let (entries, duplicates) = dedupe(entries);
    let unclassified = entries
        .iter()
        .filter(|e| e.section == Section::Unassigned)
        .map(|e| e.line_index)
        .collect();

    Classification {
        entries,
        rehomes,
        duplicates,
        unclassified,
    }
}

fn is_bgp_peer(stmt: &Statement) -> bool {
    stmt.has("remote.address") || stmt.has("remote.as") || stmt.has("remote-as")
}

fn is_ospf_template(stmt: &Statement) -> bool {
    stmt.has("area") && (stmt.has("interfaces") || stmt.has("networks") || stmt.has("auth"))
}

const VPLS_KEYS: &[&str] = &["cisco-static-id", "cisco-style-id", "pw-type", "remote-peer", "vpls-id"];

fn is_vpls(stmt: &Statement) -> bool {
    VPLS_KEYS.iter().any(|k| stmt.has(k))
}

/// Sub-menus such as `/interface vpls bgp-vpls` share VPLS and LDP keys.
fn is_mpls_family(section: &Section) -> bool {
    match section {
        Section::InterfaceVpls | Section::MplsLdpInstance | Section::MplsLdpInterface => true,
        Section::Other(path) => path.contains("vpls") || path.starts_with("/mpls"),
        _ => false,
    }
}

fn chain(stmt: &Statement) -> Option<&str> {
    stmt.value("chain")
}

fn rehome_target(base: &Section, stmt: &Statement) -> Option<(Section, &'static str)> {
    if is_bgp_peer(stmt) && !matches!(base, Section::BgpConnection | Section::BgpTemplate) {
        return Some((Section::BgpConnection, "bgp peer tokens"));
    }
    if *base == Section::IpAddress && is_ospf_template(stmt) {
        return Some((Section::OspfInterfaceTemplate, "ospf template tokens"));
    }
    if *base == Section::FirewallFilter && matches!(chain(stmt), Some("srcnat" | "dstnat")) {
        return Some((Section::FirewallNat, "nat chain"));
    }
    if !is_mpls_family(base) {
        if is_vpls(stmt) {
            return Some((Section::InterfaceVpls, "vpls tokens"));
        }
        if stmt.has("lsr-id") {
            return Some((Section::MplsLdpInstance, "ldp tokens"));
        }
    }
    None
}

/// Token-based section for a line with no header in effect.
fn infer_section(stmt: &Statement) -> Option<Section> {
    let has = |key: &str| stmt.has(key);
    match chain(stmt) {
        Some("srcnat" | "dstnat") => return Some(Section::FirewallNat),
        Some("input" | "forward" | "output") if has("action") => {
            return Some(Section::FirewallFilter)
        }
        _ => {}
    }
    if is_bgp_peer(stmt) {
        return Some(Section::BgpConnection);
    }
    if has("area") && (has("interfaces") || has("networks") || has("interface")) {
        return Some(Section::OspfInterfaceTemplate);
    }
    if is_vpls(stmt) {
        return Some(Section::InterfaceVpls);
    }
    if has("lsr-id") {
        return Some(Section::MplsLdpInstance);
    }
    if has("vlan-id") && has("interface") {
        return Some(Section::InterfaceVlan);
    }
    if has("list") && has("address") {
        return Some(Section::FirewallAddressList);
    }
    if has("interface") && stmt.value("address").is_some_and(|a| a.contains('/')) {
        return Some(Section::IpAddress);
    }
    if has("bridge") && has("interface") {
        return Some(Section::InterfaceBridgePort);
    }
    if has("slaves") {
        return Some(Section::InterfaceBonding);
    }
    if has("gateway") {
        return Some(Section::IpRoute);
    }
    None
}

#[derive(Debug, PartialEq, Eq)]
enum DedupeKey {
    Never,
    Key(String),
}

fn host_key(value: &str) -> String {
    value.split('/').next().unwrap_or(value).to_string()
}

fn dedupe_key(entry: &Entry) -> DedupeKey {
    if entry.section.is_firewall_rules() {
        return DedupeKey::Never;
    }
    let Some(stmt) = entry.statement.as_ref() else {
        return DedupeKey::Key(format!("text|{}", entry.text.trim()));
    };
    let v = |key: &str| stmt.value(key).unwrap_or("").to_string();

    let semantic = match entry.section {
        Section::BgpConnection => stmt
            .value("remote.address")
            .or_else(|| stmt.value("remote-address"))
            .map(|addr| format!("bgp|{}", host_key(addr))),
        Section::IpAddress => stmt
            .value("address")
            .map(|addr| format!("addr|{addr}|{}", v("interface"))),
        Section::FirewallAddressList => Some(format!("list|{}|{}", v("list"), v("address"))),
        Section::OspfInterfaceTemplate => Some(format!(
            "ospf|{}|{}|{}|{}",
            v("interfaces"),
            v("interface"),
            v("area"),
            v("networks")
        )),
        Section::OspfNetwork | Section::BgpNetwork => {
            stmt.value("network").map(|net| format!("net|{net}"))
        }
        Section::InterfaceBridge | Section::InterfaceVlan | Section::InterfaceBonding
            if stmt.verb == "add" =>
        {
            stmt.value("name").map(|name| format!("name|{name}"))
        }
        _ => None,
    };

    DedupeKey::Key(semantic.unwrap_or_else(|| format!("text|{stmt}")))
}

/// A duplicate may only be dropped when everything it carries is already on
/// the kept entry.
fn covered_by(dup: &Entry, kept: &Entry) -> bool {
    let dup_text = dup.render();
    let kept_text = kept.render();
    if !ipv4_hosts(&dup_text).is_subset(&ipv4_hosts(&kept_text)) {
        return false;
    }
    match (&dup.statement, &kept.statement) {
        (Some(d), Some(k)) => {
            let kept_secrets = secret_values(k);
            secret_values(d).iter().all(|s| kept_secrets.contains(s))
        }
        _ => dup_text == kept_text,
    }
}

/// Drop semantic duplicates per section, first occurrence wins, order kept.
pub fn dedupe(entries: Vec<Entry>) -> (Vec<Entry>, Vec<Duplicate>) {
    let mut seen: HashMap<(Section, String), usize> = HashMap::new();
    let mut kept: Vec<Entry> = Vec::with_capacity(entries.len());
    let mut duplicates = Vec::new();

    for entry in entries {
        let DedupeKey::Key(key) = dedupe_key(&entry) else {
            kept.push(entry);
            continue;
        };
        let slot = (entry.section.clone(), key);
        if let Some(&pos) = seen.get(&slot) {
            if covered_by(&entry, &kept[pos]) {
                debug!(
                    line = entry.line_index,
                    kept = kept[pos].line_index,
                    section = %entry.section,
                    key = %slot.1,
                    "dropped duplicate"
                );
                duplicates.push(Duplicate {
                    line_index: entry.line_index,
                    kept_line: kept[pos].line_index,
                    section: entry.section.clone(),
                    key: slot.1,
                });
                continue;
            }
        } else {
            seen.insert(slot, kept.len());
        }
        kept.push(entry);
    }
    (kept, duplicates)
}

#[cfg(test)]
mod tests {
    use super::{classify, classify_line, dedupe, ActiveSection, Entry};
    use crate::section::Section;
    use crate::source::tokenize;
    use ros_config_core::Statement;

    fn entry(section: Section, text: &str) -> Entry {
        Entry::new(1, section, Statement::parse(text).expect("parse"))
    }

    #[test]
    fn bgp_tokens_under_bfd_are_rehomed() {
        let source = tokenize(
            "/routing bfd configuration\nadd interfaces=sfp1 min-rx=200ms\nadd name=up remote.address=198.51.100.0 remote.as=64510\n",
            None,
            None,
        );
        let result = classify(&source);
        assert_eq!(result.entries[0].section, Section::RoutingBfd);
        assert_eq!(result.entries[1].section, Section::BgpConnection);
        assert_eq!(result.rehomes.len(), 1);
        assert_eq!(result.rehomes[0].from, Section::RoutingBfd);
    }

    #[test]
    fn vpls_and_ldp_lines_after_foreign_header_are_rehomed() {
        let source = tokenize(
            "/ip address
add address=10.0.0.1/24 interface=ether2
add name=vpls1 remote-peer=10.255.0.2 vpls-id=65000:100 l2mtu=1580
set enabled=yes lsr-id=10.255.0.1
",
            None,
            None,
        );
        let result = classify(&source);
        assert_eq!(result.entries[0].section, Section::IpAddress);
        assert_eq!(result.entries[1].section, Section::InterfaceVpls);
        assert_eq!(result.entries[2].section, Section::MplsLdpInstance);
        assert_eq!(result.rehomes.len(), 2);
        assert_eq!(result.rehomes[0].reason, "vpls tokens");
    }

    #[test]
    fn vpls_sub_menus_keep_their_lines() {
        let source = tokenize(
            "/interface vpls bgp-vpls
add bridge=br1 route-distinguisher=1:1 site-id=1 vpls-id=1:1
",
            None,
            None,
        );
        let result = classify(&source);
        assert!(result.rehomes.is_empty());
    }

    #[test]
    fn nat_chain_in_filter_block_moves_to_nat() {
        let source = tokenize(
            "/ip firewall filter\nadd action=masquerade chain=srcnat out-interface=ether1\n",
            None,
            None,
        );
        let result = classify(&source);
        assert_eq!(result.entries[0].section, Section::FirewallNat);
    }

    #[test]
    fn headerless_lines_use_tokens() {
        let source = tokenize(
            "add address=10.0.0.1/24 interface=ether1\nadd something=else\n",
            None,
            None,
        );
        let result = classify(&source);
        assert_eq!(result.entries[0].section, Section::IpAddress);
        assert_eq!(result.entries[1].section, Section::Unassigned);
        assert_eq!(result.unclassified, vec![2]);
    }

    #[test]
    fn inline_path_does_not_move_active_header() {
        let source = tokenize(
            "/ip route\n/system identity set name=r1\nadd gateway=10.0.0.254\n",
            None,
            None,
        );
        let mut active = ActiveSection::default();
        let sections: Vec<_> = source
            .lines
            .iter()
            .map(|line| classify_line(line, &mut active).0)
            .collect();
        assert_eq!(
            sections,
            vec![Section::IpRoute, Section::SystemIdentity, Section::IpRoute]
        );
    }

    #[test]
    fn bgp_peers_dedupe_by_remote_host() {
        let (kept, dups) = dedupe(vec![
            entry(Section::BgpConnection, "add name=a remote.address=198.51.100.0 remote.as=64510"),
            entry(Section::BgpConnection, "add name=a remote.address=198.51.100.0/32 remote.as=64510"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dups.len(), 1);
    }

    #[test]
    fn duplicates_carrying_new_secrets_are_kept() {
        let (kept, _) = dedupe(vec![
            entry(Section::BgpConnection, "add remote.address=10.0.0.1 tcp-md5-key=a"),
            entry(Section::BgpConnection, "add remote.address=10.0.0.1 tcp-md5-key=b"),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn firewall_rules_are_never_deduplicated() {
        let rule = "add action=accept chain=input protocol=icmp";
        let (kept, dups) = dedupe(vec![
            entry(Section::FirewallFilter, rule),
            entry(Section::FirewallFilter, rule),
        ]);
        assert_eq!(kept.len(), 2);
        assert!(dups.is_empty());
    }
}
