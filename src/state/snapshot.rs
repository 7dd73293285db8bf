// ABOUTME: Point-in-time view of provisioning outputs for one run.
// ABOUTME: Resolves configured output keys into typed identifiers and fails fast on gaps.

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::ResultExt;
use std::collections::BTreeMap;

use super::error::{InvalidRepositorySnafu, StateError};
use super::{Outputs, StateReader};
use crate::config::{Config, SecretSource};
use crate::types::{ClusterId, ImageRef, PlatformServiceId, SecretId, ServiceName};

const DEFAULT_REGISTRY: &str = "docker.io";

/// Everything a run needs from the provisioning layer. Read once, never refreshed.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub registry_host: String,
    pub cluster: ClusterId,
    pub region: String,
    pub project: Option<String>,
    pub public_endpoint: Option<String>,
    pub services: BTreeMap<ServiceName, ServiceOutputs>,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceOutputs {
    /// Repository URL, without a meaningful tag.
    pub repository: ImageRef,
    pub service: PlatformServiceId,
    pub secrets: Vec<SecretRef>,
}

/// A secret injected into the container environment by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRef {
    pub name: String,
    pub value_from: SecretId,
}

impl StateSnapshot {
    /// Resolve a snapshot from raw outputs.
    ///
    /// Cluster, region, and every configured service's repository, service id,
    /// and output-sourced secrets are required. Project and public endpoint
    /// are optional.
    pub fn resolve(outputs: &Outputs, config: &Config) -> Result<Self, StateError> {
        let keys = &config.state.outputs;
        let cluster = ClusterId::new(outputs.require(&keys.cluster, None)?);
        let region = outputs.require(&keys.region, None)?.to_string();
        let project = outputs
            .get(&keys.project)
            .map(str::to_string)
            .or_else(|| config.project.clone());
        let public_endpoint = outputs.get(&keys.public_endpoint).map(str::to_string);

        let mut services = BTreeMap::new();
        for service in &config.services {
            let name = Some(&service.name);
            let url = outputs.require(&service.registry_output, name)?;
            let repository = ImageRef::parse(url).context(InvalidRepositorySnafu {
                key: service.registry_output.clone(),
            })?;
            let platform_service =
                PlatformServiceId::new(outputs.require(&service.service_output, name)?);

            let mut secrets = Vec::with_capacity(service.secrets.len());
            for (env_name, source) in &service.secrets {
                let value_from = match source {
                    SecretSource::Output(key) => SecretId::new(outputs.require(key, name)?),
                    SecretSource::Arn { arn } => SecretId::new(arn.clone()),
                };
                secrets.push(SecretRef {
                    name: env_name.clone(),
                    value_from,
                });
            }

            services.insert(
                service.name.clone(),
                ServiceOutputs {
                    repository,
                    service: platform_service,
                    secrets,
                },
            );
        }

        let registry_host = services
            .values()
            .find_map(|s| s.repository.registry().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        Ok(Self {
            registry_host,
            cluster,
            region,
            project,
            public_endpoint,
            services,
            read_at: Utc::now(),
        })
    }

    pub fn service(&self, name: &ServiceName) -> Option<&ServiceOutputs> {
        self.services.get(name)
    }
}

/// Read outputs once and resolve them against the config.
pub async fn read_snapshot<R>(reader: &R, config: &Config) -> Result<StateSnapshot, StateError>
where
    R: StateReader + ?Sized,
{
    let outputs = reader.read_outputs().await?;
    tracing::debug!(outputs = outputs.len(), "read provisioning outputs");
    StateSnapshot::resolve(&outputs, config)
}
