//! Runner configuration

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Top-level runner configuration, usually read from `routewatch.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Server under test
    pub server: ServerConfig,

    /// Contract files and optional checks
    pub contract: ContractConfig,

    /// Where defect status comes from
    pub tracker: TrackerConfig,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            contract: ContractConfig::default(),
            tracker: TrackerConfig::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Connection settings for the server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://satellite.example.com`
    pub base_url: String,

    /// Basic auth user
    pub username: Option<String>,

    /// Basic auth password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Accept self-signed certificates (test servers rarely have real ones)
    pub accept_invalid_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            username: None,
            password: None,
            accept_invalid_certs: true,
        }
    }
}

/// Contract files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Reference catalog file, or a directory of catalog fragments
    pub reference: PathBuf,

    /// Deviation table; no deviations are applied when absent
    pub deviations: Option<PathBuf>,

    /// Also check the ping endpoint
    pub check_services: bool,
}

impl Default for ContractConfig {
    fn default() -> Self {
        let dir = default_contracts_dir();
        Self {
            reference: dir.join("api_v2.yaml"),
            deviations: Some(dir.join("deviations.yaml")),
            check_services: false,
        }
    }
}

impl ContractConfig {
    /// Anchor relative contract paths at `base`, leaving absolute ones alone
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.reference.is_relative() {
            self.reference = base.join(&self.reference);
        }
        if let Some(deviations) = self.deviations.as_mut() {
            if deviations.is_relative() {
                *deviations = base.join(&*deviations);
            }
        }
    }
}

/// `contracts/` directory of the workspace this crate was built from
pub fn default_contracts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(|root| root.join("contracts"))
        .unwrap_or_else(|| PathBuf::from("contracts"))
}

/// Source of "is this defect still open"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerConfig {
    /// Fixed list of open defect ids
    Static {
        #[serde(default)]
        open: BTreeSet<String>,
    },

    /// Bugzilla REST API
    Bugzilla { url: String },
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig::Static {
            open: BTreeSet::new(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file, falling back to defaults when it does not exist.
    ///
    /// Relative contract paths in the file are taken relative to the file's
    /// own directory, not the working directory.
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config = Self::from_toml(&content)?;
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.contract.resolve_relative_to(base);
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runner cannot work with
    pub fn validate(&self) -> E2eResult<()> {
        let url = self.server.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "server.base_url must start with http:// or https://, got '{}'",
                self.server.base_url
            )));
        }
        if self.server.password.is_some() && self.server.username.is_none() {
            return Err(E2eError::Config(
                "server.password is set without server.username".to_string(),
            ));
        }
        if let TrackerConfig::Bugzilla { url } = &self.tracker {
            if url.trim().is_empty() {
                return Err(E2eError::Config("tracker.url must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Path of the JSON results file
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("contract-results.json")
    }
}
