//! Dialect rewriting of classified entries.
//!
//! Order is fixed: interface mapping, the rule set's structural passes,
//! declarative rules in file order, optional house-style cleanup and a final
//! dedupe. Every step is idempotent, so rewriting an already rewritten entry
//! list changes nothing.

pub mod bgp;
pub mod bridge;
pub mod mpls;
pub mod ospf;
pub mod routes;
pub mod vpls;

use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{dedupe, Duplicate, Entry};
use crate::interface_map::InterfaceMapping;
use crate::rules::{DialectDefaults, RuleEffect, RuleSet, StructuralPass};
use crate::section::Section;

/// A source construct with no counterpart in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedConstruct {
    pub line_index: usize,
    pub section: Section,
    pub text: String,
    pub reason: String,
}

impl DroppedConstruct {
    pub fn describe(&self) -> String {
        format!(
            "line {} [{}] {} ({})",
            self.line_index, self.section, self.text, self.reason
        )
    }
}

pub struct RewriteContext<'a> {
    pub rules: &'a RuleSet,
    pub mapping: &'a InterfaceMapping,
    /// Keep `disabled=no` and empty comments exactly as written.
    pub strict_preserve: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Rewritten {
    pub entries: Vec<Entry>,
    pub dropped: Vec<DroppedConstruct>,
    pub duplicates: Vec<Duplicate>,
}

/// Rewrite classified entries into the target dialect.
pub fn rewrite(entries: &[Entry], ctx: &RewriteContext<'_>) -> Rewritten {
    let mut entries = entries.to_vec();
    let mut dropped = Vec::new();

    for entry in entries.iter_mut() {
        if let Some(stmt) = entry.statement.as_mut() {
            ctx.mapping.apply(&entry.section, stmt);
        }
    }

    for pass in &ctx.rules.passes {
        run_pass(*pass, &mut entries, &ctx.rules.defaults, &mut dropped);
    }

    let mut kept = Vec::with_capacity(entries.len());
    'entries: for mut entry in entries {
        for rule in &ctx.rules.rules {
            if !rule.matches(&entry) {
                continue;
            }
            let Some(stmt) = entry.statement.as_mut() else {
                break;
            };
            match rule.apply(stmt) {
                RuleEffect::Changed => {
                    debug!(rule = %rule.id, line = entry.line_index, "rule applied")
                }
                RuleEffect::Unchanged => {}
                RuleEffect::DroppedKey(text) => {
                    warn!(
                        rule = %rule.id,
                        line = entry.line_index,
                        arg = %text,
                        "dropped argument without target equivalent"
                    );
                    dropped.push(DroppedConstruct {
                        line_index: entry.line_index,
                        section: entry.section.clone(),
                        text,
                        reason: rule.id.clone(),
                    });
                }
                RuleEffect::DropLine => {
                    warn!(
                        rule = %rule.id,
                        line = entry.line_index,
                        section = %entry.section,
                        "dropped obsolete statement"
                    );
                    dropped.push(DroppedConstruct {
                        line_index: entry.line_index,
                        section: entry.section.clone(),
                        text: entry.render(),
                        reason: rule.id.clone(),
                    });
                    continue 'entries;
                }
            }
        }
        if !ctx.strict_preserve {
            house_style(&mut entry);
        }
        kept.push(entry);
    }

    let (entries, duplicates) = dedupe(kept);
    Rewritten {
        entries,
        dropped,
        duplicates,
    }
}

fn run_pass(
    pass: StructuralPass,
    entries: &mut Vec<Entry>,
    defaults: &DialectDefaults,
    dropped: &mut Vec<DroppedConstruct>,
) {
    match pass {
        StructuralPass::OspfLegacySplit => ospf::split_legacy(entries, defaults),
        StructuralPass::OspfInstanceArea => {
            ospf::normalize_instance_area(entries, defaults, dropped)
        }
        StructuralPass::BgpInstanceTemplate => bgp::instance_to_template(entries),
        StructuralPass::BgpNetworksAddressList => bgp::networks_to_address_list(entries, defaults),
        StructuralPass::BgpLocalRole => bgp::assign_local_role(entries, defaults),
        StructuralPass::VplsCanonical => vpls::canonicalize(entries, defaults),
        StructuralPass::LdpSingleInstance => mpls::merge_ldp_instances(entries, dropped),
        StructuralPass::BridgeVlanFiltering => bridge::enable_vlan_filtering(entries),
        StructuralPass::RoutingTableDeclare => routes::declare_routing_tables(entries, defaults),
    }
}

fn house_style(entry: &mut Entry) {
    let Some(stmt) = entry.statement.as_mut() else {
        return;
    };
    if stmt.get("disabled") == Some("no") {
        stmt.remove("disabled");
    }
    if stmt.get("comment") == Some("\"\"") {
        stmt.remove("comment");
    }
}

/// Position of the first entry matching `pred`, else the end.
pub(crate) fn position_of(entries: &[Entry], pred: impl Fn(&Entry) -> bool) -> usize {
    entries.iter().position(pred).unwrap_or(entries.len())
}

#[cfg(test)]
mod tests {
    use super::{rewrite, RewriteContext};
    use crate::classify::classify;
    use crate::interface_map::InterfaceMapping;
    use crate::rules::RuleLibrary;
    use crate::section::Section;
    use crate::source::tokenize;

    fn rewrite_text(text: &str, strict: bool) -> Vec<(Section, String)> {
        let library = RuleLibrary::embedded().expect("rules");
        let (rules, _) = library.select("7.14").expect("v7");
        let classified = classify(&tokenize(text, None, None));
        let mapping = InterfaceMapping::default();
        let ctx = RewriteContext {
            rules,
            mapping: &mapping,
            strict_preserve: strict,
        };
        rewrite(&classified.entries, &ctx)
            .entries
            .into_iter()
            .map(|e| (e.section.clone(), e.render()))
            .collect()
    }

    #[test]
    fn rewriting_twice_is_stable() {
        let text = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../fixtures/ros6-ccr1036.rsc"
        ))
        .expect("fixture");
        let library = RuleLibrary::embedded().expect("rules");
        let (rules, _) = library.select("7").expect("v7");
        let mapping = InterfaceMapping::default();
        let ctx = RewriteContext {
            rules,
            mapping: &mapping,
            strict_preserve: true,
        };
        let classified = classify(&tokenize(&text, None, None));
        let once = rewrite(&classified.entries, &ctx);
        let twice = rewrite(&once.entries, &ctx);
        assert_eq!(once.entries, twice.entries);
    }

    #[test]
    fn house_style_only_without_strict_preserve() {
        let text = "/ip dhcp-server\nadd disabled=no interface=br-lan name=dhcp1 comment=\"\"\n";
        assert_eq!(
            rewrite_text(text, true)[0].1,
            "add disabled=no interface=br-lan name=dhcp1 comment=\"\""
        );
        assert_eq!(rewrite_text(text, false)[0].1, "add interface=br-lan name=dhcp1");
    }

    #[test]
    fn obsolete_statements_are_dropped_and_recorded() {
        let library = RuleLibrary::embedded().expect("rules");
        let (rules, _) = library.select("7").expect("v7");
        let classified = classify(&tokenize(
            "/tool mac-server\nset [ find default=yes ] disabled=yes\nadd interface=ether1\n",
            None,
            None,
        ));
        let mapping = InterfaceMapping::default();
        let ctx = RewriteContext {
            rules,
            mapping: &mapping,
            strict_preserve: true,
        };
        let out = rewrite(&classified.entries, &ctx);
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].reason, "mac-server-default-entry");
    }

    #[test]
    fn removed_arguments_are_recorded() {
        let library = RuleLibrary::embedded().expect("rules");
        let (rules, _) = library.select("7").expect("v7");
        let classified = classify(&tokenize(
            "# by RouterOS 6.49.2\n/routing bgp peer\nadd name=isp1 in-filter=bgp-in remote-address=203.0.113.1 remote-as=65002\n",
            None,
            None,
        ));
        let mapping = InterfaceMapping::default();
        let ctx = RewriteContext {
            rules,
            mapping: &mapping,
            strict_preserve: true,
        };
        let out = rewrite(&classified.entries, &ctx);
        let filter = out
            .dropped
            .iter()
            .find(|d| d.reason == "bgp-in-filter")
            .expect("in-filter recorded");
        assert_eq!(filter.text, "in-filter=bgp-in");
        assert_eq!(filter.line_index, 3);
        assert!(!out.entries.iter().any(|e| e.render().contains("in-filter")));
    }

    #[test]
    fn no_bgp_in_means_no_bgp_out() {
        let out = rewrite_text(
            "/ip address\nadd address=10.0.0.1/24 interface=ether1\n/ip route\nadd gateway=10.0.0.254\n",
            true,
        );
        assert!(out.iter().all(|(section, _)| !section.is_bgp() && !section.is_ospf()));
    }
}
