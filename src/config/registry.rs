// ABOUTME: Registry credentials and tagging policy.
// ABOUTME: ECR token exchange by default, static credentials for other registries.

use super::EnvValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub auth: RegistryAuthConfig,

    #[serde(default)]
    pub tag: TagPolicy,

    /// Also push `latest` next to the unique tag.
    #[serde(default = "default_alias_latest")]
    pub alias_latest: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth: RegistryAuthConfig::default(),
            tag: TagPolicy::default(),
            alias_latest: default_alias_latest(),
        }
    }
}

fn default_alias_latest() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegistryAuthConfig {
    /// Token from `aws ecr get-login-password`, user `AWS`.
    #[default]
    Ecr,
    Basic { username: String, password: EnvValue },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    /// `<timestamp>-<content digest>` per publish.
    #[default]
    Unique,
    /// Overwrite `latest` every time.
    Latest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_aws_bin")]
    pub aws_bin: String,

    /// AWS CLI profile; the CLI's own resolution applies when unset.
    #[serde(default)]
    pub profile: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            aws_bin: default_aws_bin(),
            profile: None,
        }
    }
}

fn default_aws_bin() -> String {
    "aws".to_string()
}
