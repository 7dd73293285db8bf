// ABOUTME: Deployment trigger: ask the container platform to roll a service to a new image.
// ABOUTME: Fire-and-forget; returns once the platform accepts the request.

mod ecs;

pub use ecs::{EcsPlatform, TaskDefinitionRewrite, rewrite_task_definition};

use crate::state::{SecretRef, StateSnapshot};
use crate::types::{ClusterId, ImageRef, PlatformServiceId, ServiceName, TaskDefinitionArn};
use async_trait::async_trait;
use serde::Serialize;

/// One rolling-update request.
#[derive(Debug, Clone)]
pub struct UpdateServiceRequest {
    pub cluster: ClusterId,
    pub region: String,
    pub service: PlatformServiceId,
    /// Repository the service's container pulls from; selects the container to update.
    pub repository: ImageRef,
    pub image: ImageRef,
    pub secrets: Vec<SecretRef>,
    pub force_new_deployment: bool,
}

/// Proof the platform accepted an update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TriggerReceipt {
    pub deployment_id: Option<String>,
    pub task_definition: Option<TaskDefinitionArn>,
    /// A new task definition revision was registered for this update.
    pub registered: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TriggerError {
    #[error("service {0} is not present in the state snapshot")]
    UnknownService(ServiceName),

    /// Cluster or service id did not resolve on the platform; the snapshot is stale.
    #[error("not found on platform: {0}")]
    NotFound(String),

    #[error("platform rejected update: {0}")]
    Rejected(String),

    /// The run was cancelled before this trigger was issued.
    #[error("trigger not issued: run interrupted")]
    Interrupted,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn update_service(
        &self,
        request: &UpdateServiceRequest,
    ) -> Result<TriggerReceipt, TriggerError>;
}

/// Trigger a rolling update of `service` to `image`, resolving identifiers from the snapshot.
pub async fn trigger<P>(
    platform: &P,
    snapshot: &StateSnapshot,
    service: &ServiceName,
    image: &ImageRef,
) -> Result<TriggerReceipt, TriggerError>
where
    P: Platform + ?Sized,
{
    let outputs = snapshot
        .service(service)
        .ok_or_else(|| TriggerError::UnknownService(service.clone()))?;
    let request = UpdateServiceRequest {
        cluster: snapshot.cluster.clone(),
        region: snapshot.region.clone(),
        service: outputs.service.clone(),
        repository: outputs.repository.clone(),
        image: image.clone(),
        secrets: outputs.secrets.clone(),
        force_new_deployment: true,
    };
    let receipt = platform.update_service(&request).await?;
    tracing::info!(
        service = %service,
        cluster = %request.cluster,
        deployment = ?receipt.deployment_id,
        "deployment triggered"
    );
    Ok(receipt)
}
