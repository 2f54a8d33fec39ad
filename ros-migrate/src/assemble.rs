//! Grouping of entries under target headers in canonical order.

use std::collections::BTreeMap;

use ros_config_core::writer::{write, Block};

use crate::classify::{classify, Classification, Entry};
use crate::detect::Dialect;
use crate::section::Section;
use crate::source::tokenize;

/// Comment placed above statements that could not be assigned a section.
pub const UNASSIGNED_NOTE: &str = "# statements below could not be assigned to a section";

/// Render entries grouped by section: canonical sections in canonical order,
/// other headers by first appearance, then the unassigned trailer.
pub fn render(entries: &[Entry], dialect: Dialect, preamble: &[String]) -> String {
    let mut canonical: BTreeMap<Section, Vec<String>> = BTreeMap::new();
    let mut others: Vec<(String, Vec<String>)> = Vec::new();
    let mut unassigned: Vec<String> = Vec::new();

    for entry in entries {
        let line = entry.render();
        match &entry.section {
            Section::Unassigned => unassigned.push(line),
            Section::Other(path) => match others.iter_mut().find(|(p, _)| p == path) {
                Some((_, lines)) => lines.push(line),
                None => others.push((path.clone(), vec![line])),
            },
            section => canonical.entry(section.clone()).or_default().push(line),
        }
    }

    let mut blocks: Vec<Block> = canonical
        .into_iter()
        .map(|(section, lines)| Block {
            header: section.header(dialect),
            lines,
        })
        .collect();
    blocks.extend(
        others
            .into_iter()
            .map(|(header, lines)| Block { header, lines }),
    );
    if !unassigned.is_empty() {
        let mut lines = vec![UNASSIGNED_NOTE.to_string()];
        lines.extend(unassigned);
        blocks.push(Block {
            header: String::new(),
            lines,
        });
    }
    write(preamble, &blocks)
}

/// Re-tokenize, classify, deduplicate and regroup candidate text.
pub fn reassemble(text: &str, dialect: Dialect, preamble: &[String]) -> (String, Classification) {
    let classification = classify(&tokenize(text, None, None));
    let config = render(&classification.entries, dialect, preamble);
    (config, classification)
}

#[cfg(test)]
mod tests {
    use super::{reassemble, UNASSIGNED_NOTE};
    use crate::detect::Dialect;

    #[test]
    fn groups_and_orders_sections() {
        let text = "/system identity\nset name=r1\n/ip address\nadd address=10.0.0.1/24 interface=ether1\n/tool romon\nset enabled=yes\n/ip address\nadd address=10.0.1.1/24 interface=ether2\n";
        let (out, _) = reassemble(text, Dialect::Modern, &["generated".to_string()]);
        assert_eq!(
            out,
            "# generated\n\n/ip address\nadd address=10.0.0.1/24 interface=ether1\nadd address=10.0.1.1/24 interface=ether2\n\n/system identity\nset name=r1\n\n/tool romon\nset enabled=yes\n"
        );
    }

    #[test]
    fn unassigned_trailer_is_last_and_marked() {
        let (out, classification) = reassemble(
            "add foo=bar\n/system identity\nset name=r1\n",
            Dialect::Modern,
            &[],
        );
        assert_eq!(classification.unclassified, vec![1]);
        assert!(out.ends_with(&format!("{UNASSIGNED_NOTE}\nadd foo=bar\n")));
    }

    #[test]
    fn misplaced_bgp_is_regrouped_and_deduplicated() {
        let (out, classification) = reassemble(
            "/routing bfd configuration\nadd name=up remote.address=198.51.100.0 remote.as=64510\n/routing bgp connection\nadd name=up remote.address=198.51.100.0/32 remote.as=64510\n",
            Dialect::Modern,
            &[],
        );
        assert_eq!(classification.rehomes.len(), 1);
        assert_eq!(classification.duplicates.len(), 1);
        assert!(!out.contains("/routing bfd"));
        assert_eq!(out.matches("remote.address=198.51.100.0").count(), 1);
    }
}
