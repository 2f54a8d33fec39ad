//! Engine settings loaded from a TOML file. Every field has a default, so an
//! empty file (or no file) yields a working engine with assisted rewriting
//! turned off.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::ValidationThresholds;

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistSettings {
    #[serde(default)]
    pub enabled: bool,
    /// External program that reads a JSON request on stdin and writes the
    /// candidate configuration to stdout.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Sources larger than this go straight to the deterministic path.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    #[serde(default = "default_base_timeout_secs")]
    pub base_timeout_secs: u64,
    #[serde(default = "default_per_kib_timeout_ms")]
    pub per_kib_timeout_ms: u64,
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,
}

fn default_max_input_bytes() -> usize {
    256 * 1024
}

fn default_base_timeout_secs() -> u64 {
    30
}

fn default_per_kib_timeout_ms() -> u64 {
    500
}

fn default_max_timeout_secs() -> u64 {
    300
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            command: None,
            args: Vec::new(),
            max_input_bytes: default_max_input_bytes(),
            base_timeout_secs: default_base_timeout_secs(),
            per_kib_timeout_ms: default_per_kib_timeout_ms(),
            max_timeout_secs: default_max_timeout_secs(),
        }
    }
}

impl AssistSettings {
    /// Deadline for one assisted call on an input of `bytes` bytes.
    pub fn timeout_for(&self, bytes: usize) -> Duration {
        let kib = (bytes as u64).div_ceil(1024);
        let scaled = Duration::from_secs(self.base_timeout_secs)
            + Duration::from_millis(kib.saturating_mul(self.per_kib_timeout_ms));
        scaled.min(Duration::from_secs(self.max_timeout_secs))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub assist: AssistSettings,
    #[serde(default)]
    pub validation: ValidationThresholds,
    #[serde(default)]
    pub devices_dir: Option<PathBuf>,
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,
    #[serde(default)]
    pub compliance_file: Option<PathBuf>,
}

impl EngineSettings {
    pub fn parse(raw: &str, path: &Path) -> Result<Self, SettingsLoadError> {
        let mut settings: EngineSettings =
            toml::from_str(raw).map_err(|source| SettingsLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        // Relative directories are taken from the settings file location.
        if let Some(base) = path.parent() {
            for dir in [
                &mut settings.devices_dir,
                &mut settings.rules_dir,
                &mut settings.compliance_file,
            ] {
                if let Some(p) = dir.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(settings)
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings, SettingsLoadError> {
    let Some(path) = path else {
        return Ok(EngineSettings::default());
    };
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    EngineSettings::parse(&raw, path)
}

#[cfg(test)]
mod tests {
    use super::{load_settings, AssistSettings, EngineSettings, SettingsLoadError};
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn missing_file_path_gives_defaults() {
        let settings = load_settings(None).expect("defaults");
        assert_eq!(settings, EngineSettings::default());
        assert!(!settings.assist.enabled);
        assert_eq!(settings.validation.warning_ip_limit, 10);
        assert_eq!(settings.validation.firewall_drop_percent, 20);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let raw = "devices_dir = \"devices\"\n[assist]\nenabled = true\ncommand = \"rewrite-bot\"\n[validation]\nwarning_ip_limit = 3\n";
        let settings = EngineSettings::parse(raw, Path::new("/etc/ros/engine.toml")).expect("parse");
        assert!(settings.assist.enabled);
        assert_eq!(settings.assist.command.as_deref(), Some("rewrite-bot"));
        assert_eq!(settings.assist.base_timeout_secs, 30);
        assert_eq!(settings.validation.warning_ip_limit, 3);
        assert_eq!(settings.validation.firewall_drop_percent, 20);
        assert_eq!(
            settings.devices_dir.as_deref(),
            Some(Path::new("/etc/ros/devices"))
        );
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = EngineSettings::parse("[assist\n", Path::new("engine.toml")).unwrap_err();
        assert!(matches!(err, SettingsLoadError::Parse { .. }));
        assert!(err.to_string().contains("engine.toml"));
    }

    #[test]
    fn timeout_scales_with_input_and_caps() {
        let assist = AssistSettings::default();
        assert_eq!(assist.timeout_for(0), Duration::from_secs(30));
        assert_eq!(assist.timeout_for(10 * 1024), Duration::from_secs(35));
        assert_eq!(assist.timeout_for(10 * 1024 * 1024), Duration::from_secs(300));
    }
}
