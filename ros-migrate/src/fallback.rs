//! Deterministic translation path: mapping, rewriting and reassembly with no
//! external calls.

use tracing::info;

use crate::assemble::render;
use crate::classify::{Classification, Duplicate, Entry};
use crate::detect::Dialect;
use crate::interface_map::InterfaceMapping;
use crate::rules::RuleSet;
use crate::transform::{rewrite, DroppedConstruct, RewriteContext};

pub struct FallbackPlan<'a> {
    pub rules: &'a RuleSet,
    pub mapping: &'a InterfaceMapping,
    pub strict_preserve: bool,
    pub target_dialect: Dialect,
    pub preamble: &'a [String],
}

#[derive(Debug, Clone)]
pub struct FallbackOutput {
    pub config: String,
    pub entries: Vec<Entry>,
    pub dropped: Vec<DroppedConstruct>,
    pub duplicates: Vec<Duplicate>,
}

pub fn translate(classification: &Classification, plan: &FallbackPlan<'_>) -> FallbackOutput {
    let ctx = RewriteContext {
        rules: plan.rules,
        mapping: plan.mapping,
        strict_preserve: plan.strict_preserve,
    };
    let rewritten = rewrite(&classification.entries, &ctx);
    let config = render(&rewritten.entries, plan.target_dialect, plan.preamble);
    info!(
        entries = rewritten.entries.len(),
        dropped = rewritten.dropped.len(),
        duplicates = rewritten.duplicates.len(),
        "deterministic translation complete"
    );
    FallbackOutput {
        config,
        entries: rewritten.entries,
        dropped: rewritten.dropped,
        duplicates: rewritten.duplicates,
    }
}
