// ABOUTME: Dry-run plan: what a run would build, push, and trigger.
// ABOUTME: Derived from the snapshot only; touches neither registry nor platform.

use super::{DeploymentTarget, Rollout};
use crate::config::{Config, TagPolicy};
use crate::state::{StateError, StateReader, StateSnapshot};
use crate::types::{ClusterId, ImageRef, PlatformServiceId, ServiceName};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub cluster: ClusterId,
    pub region: String,
    pub registry_host: String,
    pub public_endpoint: Option<String>,
    pub health_url: Option<String>,
    pub services: Vec<PlannedService>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedService {
    pub service: ServiceName,
    pub context_dir: PathBuf,
    pub dockerfile: String,
    pub repository: ImageRef,
    /// `<timestamp>-<digest>` or `latest`; the digest is only known after archiving.
    pub tag: String,
    pub platform_service: PlatformServiceId,
    /// Secret env var names; identifiers only.
    pub secrets: Vec<String>,
    pub required: bool,
}

impl RunPlan {
    pub(crate) fn new(
        snapshot: &StateSnapshot,
        targets: &[DeploymentTarget],
        tag_policy: TagPolicy,
        health_path: &str,
    ) -> Self {
        let tag = match tag_policy {
            TagPolicy::Unique => "<timestamp>-<content digest>",
            TagPolicy::Latest => "latest",
        };
        let services = targets
            .iter()
            .map(|t| PlannedService {
                service: t.service.clone(),
                context_dir: t.context_dir.clone(),
                dockerfile: t.dockerfile.clone(),
                repository: t.repository.clone(),
                tag: tag.to_string(),
                platform_service: t.platform_service.clone(),
                secrets: t.secrets.iter().map(|s| s.name.clone()).collect(),
                required: t.required,
            })
            .collect();
        let health_url = snapshot
            .public_endpoint
            .as_deref()
            .and_then(|endpoint| crate::health::HealthUrl::build(endpoint, health_path).ok())
            .map(|url| url.to_string());

        Self {
            cluster: snapshot.cluster.clone(),
            region: snapshot.region.clone(),
            registry_host: snapshot.registry_host.clone(),
            public_endpoint: snapshot.public_endpoint.clone(),
            health_url,
            services,
        }
    }
}

/// Read state and describe the run without publishing or triggering.
pub async fn plan_run<R>(reader: &R, config: &Config) -> Result<RunPlan, StateError>
where
    R: StateReader + ?Sized,
{
    let loaded = Rollout::new()
        .read_state(reader, config)
        .await
        .map_err(|(_, e)| e)?;
    Ok(loaded.plan(config))
}
