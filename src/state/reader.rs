// ABOUTME: Sources of provisioning outputs.
// ABOUTME: Queries terraform directly or reads an exported outputs document.

use async_trait::async_trait;
use snafu::ResultExt;
use std::path::PathBuf;

use super::Outputs;
use super::error::{QuerySnafu, ReadFileSnafu, StateError};
use crate::config::Config;
use crate::process::CommandSpec;

/// Read-only access to the provisioning layer's recorded outputs.
#[async_trait]
pub trait StateReader: Send + Sync {
    async fn read_outputs(&self) -> Result<Outputs, StateError>;
}

/// Runs `terraform -chdir=<dir> output -json`.
#[derive(Debug, Clone)]
pub struct TerraformOutputs {
    bin: String,
    dir: PathBuf,
}

impl TerraformOutputs {
    pub fn new(bin: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl StateReader for TerraformOutputs {
    async fn read_outputs(&self) -> Result<Outputs, StateError> {
        let stdout = CommandSpec::new(&self.bin)
            .arg(format!("-chdir={}", self.dir.display()))
            .args(["output", "-json", "-no-color"])
            .output()
            .await
            .context(QuerySnafu)?;
        Outputs::from_json(&stdout)
    }
}

/// Reads a saved `terraform output -json` document.
#[derive(Debug, Clone)]
pub struct OutputsFile {
    path: PathBuf,
}

impl OutputsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateReader for OutputsFile {
    async fn read_outputs(&self) -> Result<Outputs, StateError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .context(ReadFileSnafu {
                path: self.path.clone(),
            })?;
        Outputs::from_json(&content)
    }
}

/// The configured output source.
#[derive(Debug, Clone)]
pub enum OutputSource {
    Terraform(TerraformOutputs),
    File(OutputsFile),
}

impl OutputSource {
    pub fn from_config(config: &Config) -> Self {
        match &config.state.outputs_file {
            Some(path) => OutputSource::File(OutputsFile::new(config.resolve_path(path))),
            None => OutputSource::Terraform(TerraformOutputs::new(
                &config.state.terraform_bin,
                config.resolve_path(&config.state.terraform_dir),
            )),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OutputSource::Terraform(t) => format!("terraform outputs in {}", t.dir.display()),
            OutputSource::File(f) => format!("outputs file {}", f.path.display()),
        }
    }
}

#[async_trait]
impl StateReader for OutputSource {
    async fn read_outputs(&self) -> Result<Outputs, StateError> {
        match self {
            OutputSource::Terraform(t) => t.read_outputs().await,
            OutputSource::File(f) => f.read_outputs().await,
        }
    }
}
