use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::interface_map::{PortClass, PortName};

const EMBEDDED_CATALOG: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/devices/catalog.toml"
));

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read device catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse device catalog {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// A contiguous run of numbered ports sharing a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub prefix: String,
    pub first: u32,
    pub last: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub model: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub management: Option<String>,
    pub ports: Vec<PortRange>,
}

impl DeviceProfile {
    /// Physical port names in front-panel order.
    pub fn port_names(&self) -> Vec<String> {
        self.ports
            .iter()
            .flat_map(|range| (range.first..=range.last).map(move |i| format!("{}{i}", range.prefix)))
            .collect()
    }

    /// Designated management port, else the first ethernet port.
    pub fn management_port(&self) -> Option<String> {
        self.management.clone().or_else(|| {
            self.port_names().into_iter().find(|name| {
                PortName::parse(name).is_some_and(|p| p.class() == Some(PortClass::Ethernet))
            })
        })
    }

    fn matches(&self, query: &str) -> bool {
        self.model.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    device: Vec<DeviceProfile>,
}

/// Immutable table of known device layouts.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: Vec<DeviceProfile>,
    source: String,
}

impl DeviceCatalog {
    pub fn embedded() -> Result<Self, CatalogLoadError> {
        let devices = parse_catalog(EMBEDDED_CATALOG, "embedded")?;
        Ok(Self {
            devices,
            source: "embedded".to_string(),
        })
    }

    /// Embedded catalog, with every `*.toml` in `dir` layered on top.
    /// A model defined in the directory replaces the embedded entry.
    pub fn load(dir: Option<&Path>) -> Result<Self, CatalogLoadError> {
        let mut catalog = Self::embedded()?;
        let Some(dir) = dir else {
            return Ok(catalog);
        };

        let read_dir = fs::read_dir(dir).map_err(|source| CatalogLoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|source| CatalogLoadError::Io {
                path: path.clone(),
                source,
            })?;
            for device in parse_catalog(&raw, &path.display().to_string())? {
                debug!(model = %device.model, path = %path.display(), "device override");
                catalog.devices.retain(|d| !d.model.eq_ignore_ascii_case(&device.model));
                catalog.devices.push(device);
            }
        }
        catalog.source = format!("embedded+dir:{}", dir.display());
        Ok(catalog)
    }

    /// Look a model up by name or alias, case-insensitively. A unique model
    /// prefix also matches.
    pub fn find(&self, query: &str) -> Option<&DeviceProfile> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(found) = self.devices.iter().find(|d| d.matches(query)) {
            return Some(found);
        }
        let lowered = query.to_ascii_lowercase();
        let mut prefixed = self
            .devices
            .iter()
            .filter(|d| d.model.to_ascii_lowercase().starts_with(&lowered));
        match (prefixed.next(), prefixed.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    pub fn devices(&self) -> &[DeviceProfile] {
        &self.devices
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn parse_catalog(raw: &str, origin: &str) -> Result<Vec<DeviceProfile>, CatalogLoadError> {
    toml::from_str::<CatalogFile>(raw)
        .map(|file| file.device)
        .map_err(|source| CatalogLoadError::Parse {
            path: origin.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::DeviceCatalog;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = DeviceCatalog::embedded().expect("catalog");
        let ccr = catalog.find("ccr2216-1g-12xs-2xq").expect("ccr2216");
        let ports = ccr.port_names();
        assert_eq!(ports.first().map(String::as_str), Some("ether1"));
        assert!(ports.iter().any(|p| p == "qsfp28-2-4"));
        assert_eq!(ports.len(), 1 + 12 + 8);
    }

    #[test]
    fn finds_by_alias_and_unique_prefix() {
        let catalog = DeviceCatalog::embedded().expect("catalog");
        assert_eq!(catalog.find("rb5009").map(|d| d.model.as_str()), Some("RB5009UG+S+"));
        assert_eq!(
            catalog.find("CCR2116").map(|d| d.model.as_str()),
            Some("CCR2116-12G-4S+")
        );
        assert!(catalog.find("CCR2004").is_none());
        assert!(catalog.find("hEX").is_none());
    }

    #[test]
    fn management_defaults_to_first_ethernet() {
        let catalog = DeviceCatalog::embedded().expect("catalog");
        let rb = catalog.find("RB5009UG+S+").expect("rb5009");
        assert_eq!(rb.management_port().as_deref(), Some("ether1"));
    }

    #[test]
    fn directory_entries_replace_embedded_models() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join("lab.toml"),
            r#"
[[device]]
model = "RB5009UG+S+"
ports = [{ prefix = "ether", first = 1, last = 2 }]

[[device]]
model = "LAB-1"
ports = [{ prefix = "sfp", first = 1, last = 2 }]
"#,
        )
        .expect("write");

        let catalog = DeviceCatalog::load(Some(dir.path())).expect("catalog");
        assert_eq!(catalog.find("RB5009UG+S+").expect("rb").port_names().len(), 2);
        assert!(catalog.find("lab-1").is_some());
        assert!(catalog.source().starts_with("embedded+dir:"));
    }

    #[test]
    fn malformed_override_is_an_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("bad.toml"), "[[device]\nmodel=").expect("write");
        assert!(DeviceCatalog::load(Some(dir.path())).is_err());
    }
}
