// ABOUTME: Per-service build and deployment configuration.
// ABOUTME: Maps a service to its build context and the provisioning outputs that locate it.

use super::EnvValue;
use crate::types::ServiceName;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: ServiceName,

    /// Build context directory, relative to the config root. Defaults to the service name.
    #[serde(default)]
    pub context: Option<PathBuf>,

    /// Dockerfile path inside the build context.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,

    /// Output holding the image repository URL.
    pub registry_output: String,

    /// Output holding the platform service name or ARN.
    pub service_output: String,

    /// Environment variable name -> secret reference injected into the task definition.
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretSource>,

    #[serde(default)]
    pub build_args: BTreeMap<String, EnvValue>,

    /// A required service that fails to publish or trigger makes the run exit non-zero
    /// even when other services deployed.
    #[serde(default)]
    pub required: bool,
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

impl ServiceConfig {
    pub fn context_dir(&self, root: &Path) -> PathBuf {
        match &self.context {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(self.name.as_str()),
        }
    }
}

/// Where a secret identifier comes from. The value itself is never read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretSource {
    /// Name of a provisioning output holding the secret ARN.
    Output(String),
    /// Literal secret ARN or name.
    Arn { arn: String },
}
