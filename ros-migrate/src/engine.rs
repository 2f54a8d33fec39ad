//! Translation orchestration.
//!
//! An [`Engine`] owns the immutable reference data (device catalog, rule
//! library, compliance baseline, settings) and runs one request at a time
//! through a fixed pipeline:
//!
//! 1. **Tokenizing**: logical lines, version and model detection
//! 2. **Classifying**: section assignment, re-homing, dedupe, interface mapping
//! 3. **AttemptingAssistedRewrite**: only with an enabled assistant and a
//!    source within the byte budget
//! 4. **Validating**: the assisted candidate against the source
//! 5. **Accepted** or **FallingBack**: a critical assisted candidate (or no
//!    attempt at all) is replaced by the deterministic translation, which is
//!    validated with the fallback record and attempt history attached
//! 6. **ReassemblingOutput**: grouping under target headers, optional
//!    compliance block
//! 7. **Done**
//!
//! The engine holds no per-request state and is shared freely across threads.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::assemble::reassemble;
use crate::assist::{
    run_with_timeout, AssistError, AssistedRewriter, CommandRewriter, RewriteRequest,
};
use crate::classify::{classify, Classification};
use crate::compliance::{ComplianceBlock, ComplianceLoadError};
use crate::detect::{parse_major, Dialect};
use crate::devices::{CatalogLoadError, DeviceCatalog};
use crate::fallback::{translate, FallbackPlan};
use crate::interface_map::{
    bond_groups, build_mapping, referenced_interfaces, InterfaceMapping, PortLayout,
};
use crate::rules::{RuleLibrary, RuleLoadError};
use crate::settings::{load_settings, EngineSettings, SettingsLoadError};
use crate::source::{tokenize, SourceConfig};
use crate::validate::{
    validate, CandidatePath, FallbackReason, FallbackRecord, ValidationContext, ValidationReport,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub source_config: String,
    pub target_device: String,
    pub target_version: String,
    #[serde(default)]
    pub source_device: Option<String>,
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default = "default_true")]
    pub strict_preserve: bool,
    #[serde(default)]
    pub apply_compliance: bool,
}

impl TranslationRequest {
    pub fn new(
        source_config: impl Into<String>,
        target_device: impl Into<String>,
        target_version: impl Into<String>,
    ) -> Self {
        Self {
            source_config: source_config.into(),
            target_device: target_device.into(),
            target_version: target_version.into(),
            source_device: None,
            source_version: None,
            strict_preserve: true,
            apply_compliance: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Tokenizing,
    Classifying,
    AttemptingAssistedRewrite,
    Validating,
    Accepted,
    FallingBack,
    ReassemblingOutput,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    pub config: String,
    pub interface_mapping: InterfaceMapping,
    pub validation: ValidationReport,
    pub source_version: String,
    pub source_device: String,
    pub target_dialect: Dialect,
    pub rules_source: String,
    pub trace: Vec<PipelineState>,
}

impl TranslationOutcome {
    pub fn used_fallback(&self) -> bool {
        self.validation.fallback.is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("target device is required")]
    MissingTargetDevice,
    #[error("target version is required")]
    MissingTargetVersion,
    #[error("source configuration is empty")]
    EmptySource,
    #[error("unknown target device: {0}")]
    UnknownDevice(String),
    #[error("invalid target version: {0}")]
    InvalidTargetVersion(String),
    #[error("downgrade from RouterOS {source_major} to {target_major} is not supported")]
    UnsupportedDowngrade { source_major: u32, target_major: u32 },
    #[error("no rule set for target version {0}")]
    NoRuleSet(String),
}

#[derive(Debug, Error)]
pub enum EngineLoadError {
    #[error(transparent)]
    Settings(#[from] SettingsLoadError),
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
    #[error(transparent)]
    Rules(#[from] RuleLoadError),
    #[error(transparent)]
    Compliance(#[from] ComplianceLoadError),
}

pub struct Engine {
    settings: EngineSettings,
    catalog: DeviceCatalog,
    rules: RuleLibrary,
    compliance: ComplianceBlock,
    assistant: Option<Arc<dyn AssistedRewriter>>,
}

/// Records visited states; a state is never entered twice.
struct Trace(Vec<PipelineState>);

impl Trace {
    fn enter(&mut self, state: PipelineState) {
        debug_assert!(!self.0.contains(&state), "state {state:?} re-entered");
        info!(state = ?state, "pipeline");
        self.0.push(state);
    }
}

impl Engine {
    /// Engine with embedded data and settings overrides applied. A configured
    /// assist command becomes the assistant.
    pub fn from_settings(settings: EngineSettings) -> Result<Self, EngineLoadError> {
        let catalog = DeviceCatalog::load(settings.devices_dir.as_deref())?;
        let rules = RuleLibrary::load(settings.rules_dir.as_deref())?;
        let compliance = ComplianceBlock::load(settings.compliance_file.as_deref())?;
        let assistant = settings.assist.command.as_ref().map(|program| {
            Arc::new(CommandRewriter::new(program.clone(), settings.assist.args.clone()))
                as Arc<dyn AssistedRewriter>
        });
        info!(
            devices = catalog.devices().len(),
            catalog = catalog.source(),
            compliance = compliance.source(),
            assist = assistant.is_some(),
            "engine loaded"
        );
        Ok(Self {
            settings,
            catalog,
            rules,
            compliance,
            assistant,
        })
    }

    pub fn load(settings_path: Option<&Path>) -> Result<Self, EngineLoadError> {
        Self::from_settings(load_settings(settings_path)?)
    }

    pub fn new() -> Result<Self, EngineLoadError> {
        Self::from_settings(EngineSettings::default())
    }

    /// Replace the assistant. Assisted rewriting still requires
    /// `assist.enabled` in the settings.
    pub fn with_assistant(mut self, assistant: Arc<dyn AssistedRewriter>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationOutcome, TranslateError> {
        let target_device = request.target_device.trim();
        if target_device.is_empty() {
            return Err(TranslateError::MissingTargetDevice);
        }
        let target_version = request.target_version.trim();
        if target_version.is_empty() {
            return Err(TranslateError::MissingTargetVersion);
        }
        if request.source_config.trim().is_empty() {
            return Err(TranslateError::EmptySource);
        }
        let target_profile = self
            .catalog
            .find(target_device)
            .ok_or_else(|| TranslateError::UnknownDevice(target_device.to_string()))?;
        let target_dialect = Dialect::from_version(target_version)
            .ok_or_else(|| TranslateError::InvalidTargetVersion(target_version.to_string()))?;
        let (rule_set, rules_source) = self
            .rules
            .select(target_version)
            .ok_or_else(|| TranslateError::NoRuleSet(target_version.to_string()))?;

        let mut trace = Trace(Vec::new());

        trace.enter(PipelineState::Tokenizing);
        let source = tokenize(
            &request.source_config,
            request.source_version.as_deref(),
            request.source_device.as_deref(),
        );
        if let Some(source_major) = parse_major(&source.version.value) {
            let target_major = parse_major(target_version).unwrap_or(target_dialect.major());
            if source_major > target_major {
                return Err(TranslateError::UnsupportedDowngrade {
                    source_major,
                    target_major,
                });
            }
        }

        trace.enter(PipelineState::Classifying);
        let classification = classify(&source);
        let mapping = self.map_interfaces(&source, &classification, target_profile.into());

        let preamble = vec![format!(
            "translated from RouterOS {} ({}) to RouterOS {} ({})",
            source.version.value, source.model.value, target_version, target_profile.model
        )];
        let base_ctx = ValidationContext {
            thresholds: self.settings.validation,
            unmapped_interfaces: mapping.unmapped.clone(),
            unclassified_lines: classification.unclassified.len(),
            ..Default::default()
        };

        let assisted = match self.assist_gate(&source) {
            Ok(assistant) => {
                trace.enter(PipelineState::AttemptingAssistedRewrite);
                let rewrite_request = RewriteRequest {
                    source_config: source.text.clone(),
                    source_version: source.version.value.clone(),
                    source_device: source.model.value.clone(),
                    target_version: target_version.to_string(),
                    target_device: target_profile.model.clone(),
                    target_dialect,
                    interface_mapping: mapping.clone(),
                    strict_preserve: request.strict_preserve,
                    timeout: self.settings.assist.timeout_for(source.text.len()),
                };
                let timeout = rewrite_request.timeout;
                let (candidate, failure) = match run_with_timeout(assistant, rewrite_request) {
                    Ok(text) => (text, None),
                    Err(AssistError::Timeout(_)) => {
                        warn!(?timeout, "assisted rewrite timed out");
                        (
                            String::new(),
                            Some(FallbackReason::TimedOut {
                                seconds: timeout.as_secs(),
                            }),
                        )
                    }
                    Err(err) => {
                        warn!(error = %err, "assisted rewrite failed");
                        (
                            String::new(),
                            Some(FallbackReason::AssistFailed {
                                message: err.to_string(),
                            }),
                        )
                    }
                };

                trace.enter(PipelineState::Validating);
                let report = validate(&source.text, &candidate, &base_ctx);
                if report.is_critical() {
                    warn!(
                        missing_ips = report.missing_ips.len(),
                        issues = report.issues.len(),
                        "assisted candidate rejected"
                    );
                    Err((
                        failure.unwrap_or(FallbackReason::ValidationFailed),
                        vec![report.attempt(CandidatePath::Assisted)],
                    ))
                } else {
                    trace.enter(PipelineState::Accepted);
                    Ok((candidate, report))
                }
            }
            Err(reason) => Err((reason, Vec::new())),
        };

        let (config, validation) = match assisted {
            Ok((candidate, report)) => {
                trace.enter(PipelineState::ReassemblingOutput);
                let (config, _) = reassemble(&candidate, target_dialect, &preamble);
                (config, report)
            }
            Err((reason, history)) => {
                trace.enter(PipelineState::FallingBack);
                info!(reason = ?reason, "using deterministic translation");
                let output = translate(
                    &classification,
                    &FallbackPlan {
                        rules: rule_set,
                        mapping: &mapping,
                        strict_preserve: request.strict_preserve,
                        target_dialect,
                        preamble: &preamble,
                    },
                );
                let ctx = ValidationContext {
                    dropped_constructs: output.dropped.iter().map(|d| d.describe()).collect(),
                    fallback: Some(FallbackRecord { reason }),
                    history,
                    ..base_ctx
                };
                let report = validate(&source.text, &output.config, &ctx);
                trace.enter(PipelineState::ReassemblingOutput);
                (output.config, report)
            }
        };

        let config = if request.apply_compliance {
            self.compliance.append_to(&config)
        } else {
            config
        };
        trace.enter(PipelineState::Done);

        Ok(TranslationOutcome {
            config,
            interface_mapping: mapping,
            validation,
            source_version: source.version.value.clone(),
            source_device: source.model.value.clone(),
            target_dialect,
            rules_source,
            trace: trace.0,
        })
    }

    /// The assistant to call, or why there is none.
    fn assist_gate(
        &self,
        source: &SourceConfig,
    ) -> Result<Arc<dyn AssistedRewriter>, FallbackReason> {
        let Some(assistant) = self.assistant.as_ref() else {
            return Err(FallbackReason::NotConfigured);
        };
        if !self.settings.assist.enabled {
            return Err(FallbackReason::Disabled);
        }
        let limit = self.settings.assist.max_input_bytes;
        if source.text.len() > limit {
            return Err(FallbackReason::InputTooLarge {
                bytes: source.text.len(),
                limit,
            });
        }
        Ok(Arc::clone(assistant))
    }

    /// Mapping from the source layout (catalog entry, or the ports the config
    /// references) to `target`.
    pub fn map_interfaces(
        &self,
        source: &SourceConfig,
        classification: &Classification,
        target: PortLayout,
    ) -> InterfaceMapping {
        let referenced = referenced_interfaces(&classification.entries);
        let bonds = bond_groups(&classification.entries);
        let source_layout = match self.catalog.find(&source.model.value) {
            Some(profile) => PortLayout::from(profile),
            None => PortLayout::from_referenced(&referenced),
        };
        build_mapping(&source_layout, &target, &referenced, &bonds)
    }
}
