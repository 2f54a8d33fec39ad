use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use ros_config_core::statement::Statement;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classify::Entry;
use crate::detect::{parse_major, Dialect};
use crate::section::Section;

const EMBEDDED_V6: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/rules/v6.toml"));
const EMBEDDED_V7: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/rules/v7.toml"));

/// Errors returned when loading rule files.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rules {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rules {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid pattern in rule '{id}' ({path}): {source}")]
    Pattern {
        path: String,
        id: String,
        source: regex::Error,
    },
    #[error("invalid rule '{id}' ({path}): {reason}")]
    Invalid {
        path: String,
        id: String,
        reason: String,
    },
}

/// Whole-config transformations that cannot be expressed per statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructuralPass {
    OspfLegacySplit,
    OspfInstanceArea,
    BgpInstanceTemplate,
    BgpNetworksAddressList,
    BgpLocalRole,
    VplsCanonical,
    LdpSingleInstance,
    BridgeVlanFiltering,
    RoutingTableDeclare,
}

/// Dialect constants referenced by structural passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectDefaults {
    pub ospf_instance: String,
    pub ospf_backbone_area: String,
    pub bgp_template: String,
    pub bgp_output_network: String,
    pub routing_table: String,
    pub vpls_pw_l2mtu: u32,
}

impl Default for DialectDefaults {
    fn default() -> Self {
        Self {
            ospf_instance: "default-v2".to_string(),
            ospf_backbone_area: "backbone-v2".to_string(),
            bgp_template: "default".to_string(),
            bgp_output_network: "bgp-networks".to_string(),
            routing_table: "main".to_string(),
            vpls_pw_l2mtu: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleAction {
    /// Rename the matched key.
    RenameKey { to: String },
    /// Replace the matched key's value.
    MapValue { to: String },
    /// Add `key=value` to matched statements lacking it.
    Inject { key: String, value: String },
    /// Like `inject`, restricted to `add` statements.
    Default { key: String, value: String },
    /// Remove the matched key.
    DropKey,
    /// Remove the whole statement (logged as a dropped construct).
    DropLine,
    /// Append `/32` (or `/128`) to a bare host address.
    HostPrefix,
    /// Replace the statement verb.
    SetVerb { to: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawMatch {
    key: Option<String>,
    value: Option<String>,
    verb: Option<String>,
    pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    id: String,
    section: Section,
    #[serde(rename = "match", default)]
    matcher: RawMatch,
    action: RuleAction,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    dialect: u32,
    #[serde(default)]
    passes: Vec<StructuralPass>,
    #[serde(default)]
    defaults: DialectDefaults,
    #[serde(default, rename = "rule")]
    rules: Vec<RawRule>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleMatch {
    pub key: Option<String>,
    pub value: Option<String>,
    pub verb: Option<String>,
    pub pattern: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub id: String,
    pub section: Section,
    pub matcher: RuleMatch,
    pub action: RuleAction,
}

/// What a rule did to one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEffect {
    Unchanged,
    Changed,
    /// An argument was removed; carries the removed `key=value`.
    DroppedKey(String),
    DropLine,
}

impl RewriteRule {
    pub fn matches(&self, entry: &Entry) -> bool {
        if entry.section != self.section {
            return false;
        }
        let Some(stmt) = entry.statement.as_ref() else {
            return false;
        };
        let m = &self.matcher;
        if m.verb.as_deref().is_some_and(|verb| verb != stmt.verb) {
            return false;
        }
        if let Some(key) = m.key.as_deref() {
            if !stmt.has(key) {
                return false;
            }
            if m.value.as_deref().is_some_and(|want| stmt.value(key) != Some(want)) {
                return false;
            }
        }
        match &m.pattern {
            Some(pattern) => pattern.is_match(&stmt.to_string()),
            None => true,
        }
    }

    /// Apply the action to a statement already known to match.
    pub fn apply(&self, stmt: &mut Statement) -> RuleEffect {
        let key = self.matcher.key.as_deref().unwrap_or_default();
        let changed = match &self.action {
            RuleAction::RenameKey { to } => stmt.rename(key, to),
            RuleAction::MapValue { to } => {
                if stmt.value(key) == Some(to.as_str()) {
                    false
                } else {
                    stmt.set(key, to.clone());
                    true
                }
            }
            RuleAction::Inject { key, value } => stmt.ensure(key, value.clone()),
            RuleAction::Default { key, value } => stmt.verb == "add" && stmt.ensure(key, value.clone()),
            RuleAction::DropKey => {
                if !stmt.has(key) {
                    return RuleEffect::Unchanged;
                }
                let removed = match stmt.remove(key) {
                    Some(value) => format!("{key}={value}"),
                    None => key.to_string(),
                };
                return RuleEffect::DroppedKey(removed);
            }
            RuleAction::DropLine => return RuleEffect::DropLine,
            RuleAction::HostPrefix => {
                let prefixed = stmt
                    .value(key)
                    .filter(|addr| !addr.is_empty() && !addr.contains('/'))
                    .map(|addr| {
                        let bits = if addr.contains(':') { 128 } else { 32 };
                        format!("{addr}/{bits}")
                    });
                match prefixed {
                    Some(value) => {
                        stmt.set(key, value);
                        true
                    }
                    None => false,
                }
            }
            RuleAction::SetVerb { to } => {
                if stmt.verb == *to {
                    false
                } else {
                    stmt.verb = to.clone();
                    true
                }
            }
        };
        if changed {
            RuleEffect::Changed
        } else {
            RuleEffect::Unchanged
        }
    }
}

/// Passes, defaults and rules for one target dialect.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub dialect: Dialect,
    pub passes: Vec<StructuralPass>,
    pub defaults: DialectDefaults,
    pub rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn parse(raw: &str, origin: &str) -> Result<Self, RuleLoadError> {
        let file: RuleFile = toml::from_str(raw).map_err(|source| RuleLoadError::Parse {
            path: origin.to_string(),
            source,
        })?;
        let dialect = Dialect::from_version(&file.dialect.to_string()).unwrap_or(Dialect::Modern);

        let mut rules = Vec::with_capacity(file.rules.len());
        for raw in file.rules {
            rules.push(compile_rule(raw, origin)?);
        }
        Ok(Self {
            dialect,
            passes: file.passes,
            defaults: file.defaults,
            rules,
        })
    }

    pub fn has_pass(&self, pass: StructuralPass) -> bool {
        self.passes.contains(&pass)
    }
}

fn compile_rule(raw: RawRule, origin: &str) -> Result<RewriteRule, RuleLoadError> {
    let invalid = |reason: &str| RuleLoadError::Invalid {
        path: origin.to_string(),
        id: raw.id.clone(),
        reason: reason.to_string(),
    };
    let needs_key = matches!(
        raw.action,
        RuleAction::RenameKey { .. }
            | RuleAction::MapValue { .. }
            | RuleAction::DropKey
            | RuleAction::HostPrefix
    );
    if needs_key && raw.matcher.key.is_none() {
        return Err(invalid("action needs match.key"));
    }
    if matches!(raw.action, RuleAction::MapValue { .. }) && raw.matcher.value.is_none() {
        return Err(invalid("map-value needs match.value"));
    }
    if raw.matcher.value.is_some() && raw.matcher.key.is_none() {
        return Err(invalid("match.value needs match.key"));
    }

    let pattern = match raw.matcher.pattern.as_deref() {
        Some(p) => Some(Regex::new(p).map_err(|source| RuleLoadError::Pattern {
            path: origin.to_string(),
            id: raw.id.clone(),
            source,
        })?),
        None => None,
    };

    Ok(RewriteRule {
        id: raw.id,
        section: raw.section,
        matcher: RuleMatch {
            key: raw.matcher.key,
            value: raw.matcher.value,
            verb: raw.matcher.verb,
            pattern,
        },
        action: raw.action,
    })
}

/// Rule sets keyed by file name (`7.toml`, `default.toml`, ...), loaded once.
#[derive(Debug, Clone)]
pub struct RuleLibrary {
    embedded: BTreeMap<String, RuleSet>,
    overrides: BTreeMap<String, (RuleSet, PathBuf)>,
}

impl RuleLibrary {
    pub fn embedded() -> Result<Self, RuleLoadError> {
        let v6 = RuleSet::parse(EMBEDDED_V6, "embedded:v6.toml")?;
        let v7 = RuleSet::parse(EMBEDDED_V7, "embedded:v7.toml")?;
        let mut embedded = BTreeMap::new();
        embedded.insert("6.toml".to_string(), v6);
        embedded.insert("7.toml".to_string(), v7.clone());
        embedded.insert("default.toml".to_string(), v7);
        Ok(Self {
            embedded,
            overrides: BTreeMap::new(),
        })
    }

    /// Embedded rule sets plus every `*.toml` in `dir`.
    pub fn load(dir: Option<&Path>) -> Result<Self, RuleLoadError> {
        let mut library = Self::embedded()?;
        let Some(dir) = dir else {
            return Ok(library);
        };
        let read_dir = fs::read_dir(dir).map_err(|source| RuleLoadError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in read_dir.filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "toml") {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).map_err(|source| RuleLoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let set = RuleSet::parse(&raw, &path.display().to_string())?;
            debug!(file = %path.display(), rules = set.rules.len(), "loaded rule override");
            library.overrides.insert(name, (set, path));
        }
        Ok(library)
    }

    /// Rule set for `version`, trying `<version>.toml`, `<major>.toml`, then
    /// `default.toml`; the directory wins over embedded data for each name.
    pub fn select(&self, version: &str) -> Option<(&RuleSet, String)> {
        let version = version.trim();
        let mut names = Vec::new();
        if !version.is_empty() {
            names.push(format!("{version}.toml"));
            if let Some(major) = parse_major(version) {
                names.push(format!("{major}.toml"));
            }
        }
        names.push("default.toml".to_string());

        for name in names {
            if let Some((set, path)) = self.overrides.get(&name) {
                return Some((set, format!("file:{}", path.display())));
            }
            if let Some(set) = self.embedded.get(&name) {
                return Some((set, "embedded".to_string()));
            }
        }
        None
    }
}
