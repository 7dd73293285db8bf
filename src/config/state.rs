// ABOUTME: Where provisioning outputs are read from and which keys hold what.
// ABOUTME: Terraform working directory or an exported `terraform output -json` file.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Terraform working directory, relative to the config root.
    #[serde(default = "default_terraform_dir")]
    pub terraform_dir: PathBuf,

    /// Pre-exported outputs document. Takes precedence over `terraform_dir`.
    #[serde(default)]
    pub outputs_file: Option<PathBuf>,

    #[serde(default = "default_terraform_bin")]
    pub terraform_bin: String,

    #[serde(default)]
    pub outputs: OutputKeys,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            terraform_dir: default_terraform_dir(),
            outputs_file: None,
            terraform_bin: default_terraform_bin(),
            outputs: OutputKeys::default(),
        }
    }
}

/// Output names for the run-wide values. Per-service keys live on each service.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputKeys {
    #[serde(default = "default_cluster_key")]
    pub cluster: String,
    #[serde(default = "default_region_key")]
    pub region: String,
    #[serde(default = "default_endpoint_key")]
    pub public_endpoint: String,
    #[serde(default = "default_project_key")]
    pub project: String,
}

impl Default for OutputKeys {
    fn default() -> Self {
        Self {
            cluster: default_cluster_key(),
            region: default_region_key(),
            public_endpoint: default_endpoint_key(),
            project: default_project_key(),
        }
    }
}

fn default_terraform_dir() -> PathBuf {
    PathBuf::from("infra")
}

fn default_terraform_bin() -> String {
    "terraform".to_string()
}

fn default_cluster_key() -> String {
    "ecs_cluster_name".to_string()
}

fn default_region_key() -> String {
    "aws_region".to_string()
}

fn default_endpoint_key() -> String {
    "alb_dns_name".to_string()
}

fn default_project_key() -> String {
    "project_name".to_string()
}
