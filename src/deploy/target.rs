// ABOUTME: Deployment targets: one service's config joined with its provisioning outputs.
// ABOUTME: Built once per run after the state read and never modified.

use crate::config::{Config, EnvValue};
use crate::state::{SecretRef, StateSnapshot};
use crate::types::{ImageRef, PlatformServiceId, ServiceName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

const DEFAULT_REGISTRY_HOST: &str = "docker.io";

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentTarget {
    pub service: ServiceName,
    pub context_dir: PathBuf,
    pub dockerfile: String,
    #[serde(skip)]
    pub build_args: BTreeMap<String, EnvValue>,
    pub repository: ImageRef,
    pub platform_service: PlatformServiceId,
    pub secrets: Vec<SecretRef>,
    pub required: bool,
}

impl DeploymentTarget {
    /// One target per configured service, in config order.
    ///
    /// Services missing from the snapshot are skipped; `StateSnapshot::resolve`
    /// already rejects configs whose outputs are incomplete.
    pub fn resolve_all(config: &Config, snapshot: &StateSnapshot) -> Vec<Self> {
        config
            .services
            .iter()
            .filter_map(|service| {
                let outputs = snapshot.service(&service.name)?;
                Some(Self {
                    service: service.name.clone(),
                    context_dir: service.context_dir(&config.root),
                    dockerfile: service.dockerfile.clone(),
                    build_args: service.build_args.clone(),
                    repository: outputs.repository.clone(),
                    platform_service: outputs.service.clone(),
                    secrets: outputs.secrets.clone(),
                    required: service.required,
                })
            })
            .collect()
    }

    pub fn registry_host(&self) -> &str {
        self.repository.registry().unwrap_or(DEFAULT_REGISTRY_HOST)
    }
}
