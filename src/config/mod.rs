//! Publisher configuration
//!
//! Loaded from `metapin.toml` (or a path given on the command line) and
//! validated once before any publisher is constructed.

mod compiler;

pub use compiler::{CompilerSettings, BYTECODE_HASH_GUIDANCE, IPFS_BYTECODE_HASH};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "metapin.toml";

/// Default Kubo RPC endpoint
pub const DEFAULT_API_URL: &str = "https://ipfs.qu.ai/api/v0";

/// What to do when one candidate fails to publish or verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure; persist nothing
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining candidates
    Isolate,
}

/// Top-level publisher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Refuse to run unless the build embeds content addresses
    #[serde(default = "default_true")]
    pub require_content_addressing: bool,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub paths: PathSettings,

    /// Compilers used by the build
    #[serde(default, rename = "compiler")]
    pub compilers: Vec<CompilerSettings>,
}

/// Storage backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Kubo RPC base URL (including `/api/v0`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Pin documents after adding them
    #[serde(default = "default_true")]
    pub pin: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Project paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Project root; other paths are relative to it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Hardhat artifacts directory
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,

    /// Output directory for published metadata documents
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_artifacts() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("metadata")
}

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Content addressing is disabled (require_content_addressing = false). {}", BYTECODE_HASH_GUIDANCE)]
    ContentAddressingDisabled,

    #[error("No configured compiler embeds an IPFS hash. {}", BYTECODE_HASH_GUIDANCE)]
    BytecodeHashNotIpfs,

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            pin: true,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            artifacts: default_artifacts(),
            metadata: default_metadata(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            require_content_addressing: true,
            on_failure: FailurePolicy::default(),
            storage: StorageSettings::default(),
            paths: PathSettings::default(),
            compilers: Vec::new(),
        }
    }
}

impl PublisherConfig {
    /// Load configuration from a specific path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path` if given, else from `metapin.toml` when present,
    /// else fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PublisherConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.require_content_addressing {
            return Err(ConfigError::ContentAddressingDisabled);
        }

        if !self.compilers.is_empty() && !self.compilers.iter().any(|c| c.embeds_ipfs()) {
            return Err(ConfigError::BytecodeHashNotIpfs);
        }

        let url = &self.storage.api_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "storage.api_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }

        if self.storage.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.timeout_seconds".to_string(),
                reason: "timeout cannot be 0".to_string(),
            });
        }

        for (field, path) in [
            ("paths.artifacts", &self.paths.artifacts),
            ("paths.metadata", &self.paths.metadata),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "path cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Artifacts directory resolved against the project root
    pub fn artifacts_dir(&self) -> PathBuf {
        self.paths.root.join(&self.paths.artifacts)
    }

    /// Metadata output directory resolved against the project root
    pub fn metadata_dir(&self) -> PathBuf {
        self.paths.root.join(&self.paths.metadata)
    }

    /// Override the project root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths.root = root.into();
        self
    }
}
