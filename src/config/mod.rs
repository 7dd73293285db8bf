// ABOUTME: Configuration types and parsing for rollout.yml.
// ABOUTME: Handles discovery, YAML parsing, defaults, and validation.

mod deserialize;
mod env_value;
mod health;
mod init;
mod registry;
mod service;
mod state;

pub use env_value::{EnvValue, resolve_env_map};
pub use health::{HealthConfig, VerifyPolicy};
pub use init::{TEMPLATE, init_config};
pub use registry::{PlatformConfig, RegistryAuthConfig, RegistryConfig, TagPolicy};
pub use service::{SecretSource, ServiceConfig};
pub use state::{OutputKeys, StateConfig};

use crate::error::{Error, Result};
use crate::types::ServiceName;
use deserialize::deserialize_services;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "rollout.yml";
pub const CONFIG_FILENAME_ALT: &str = "rollout.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".rollout/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name prefix used when the provisioning layer does not report one.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(deserialize_with = "deserialize_services")]
    pub services: NonEmpty<ServiceConfig>,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Directory relative paths resolve against. Set by `load`/`discover`.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    /// Simultaneous build+push pipelines.
    #[serde(default = "default_builds")]
    pub builds: usize,

    /// Simultaneous trigger requests.
    #[serde(default = "default_triggers")]
    pub triggers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            builds: default_builds(),
            triggers: default_triggers(),
        }
    }
}

fn default_builds() -> usize {
    2
}

fn default_triggers() -> usize {
    4
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.root = config_root(path);
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency.builds == 0 || self.concurrency.triggers == 0 {
            return Err(Error::InvalidConfig(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if !self.health.path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "health path must start with '/': {}",
                self.health.path
            )));
        }
        for service in &self.services {
            if service.registry_output.is_empty() || service.service_output.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "service {} needs registry_output and service_output",
                    service.name
                )));
            }
        }
        Ok(())
    }

    pub fn service(&self, name: &ServiceName) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Resolve a config-relative path.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// The project directory for a config file: its parent, or the parent's
/// parent for `.rollout/config.yml`.
fn config_root(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    match parent.file_name() {
        Some(name) if name == ".rollout" => parent
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
        _ => parent.to_path_buf(),
    }
}
