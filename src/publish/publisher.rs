// ABOUTME: Per-service publish pipeline: authenticate, build, tag, push.
// ABOUTME: Produces a PublishResult whether the service succeeded or not.

use super::context::load_context;
use super::registry::{BuildRequest, Registry};
use super::PublishError;
use crate::config::{RegistryConfig, TagPolicy, resolve_env_map};
use crate::deploy::DeploymentTarget;
use crate::types::{ImageRef, ImageTag, ServiceName};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

/// An image that reached the registry.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedImage {
    /// The reference the platform is pointed at.
    pub image: ImageRef,
    /// BLAKE3 digest of the build context.
    pub content_digest: String,
    /// Registry manifest digest, when reported.
    pub registry_digest: Option<String>,
    /// Extra tags pushed for the same image.
    pub aliases: Vec<ImageRef>,
    /// Alias push failure; the primary tag is still usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_error: Option<String>,
}

/// Outcome of publishing one service.
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub service: ServiceName,
    pub outcome: Result<PublishedImage, PublishError>,
}

impl PublishResult {
    pub fn interrupted(service: ServiceName) -> Self {
        Self {
            service,
            outcome: Err(PublishError::Interrupted),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct ImagePublisher<'a, R: ?Sized> {
    registry: &'a R,
    tag_policy: TagPolicy,
    alias_latest: bool,
}

impl<'a, R: Registry + ?Sized> ImagePublisher<'a, R> {
    pub fn new(registry: &'a R, config: &RegistryConfig) -> Self {
        Self {
            registry,
            tag_policy: config.tag,
            alias_latest: config.alias_latest,
        }
    }

    /// Publish one service. Never panics and never returns early for other services.
    pub async fn publish(&self, target: &DeploymentTarget) -> PublishResult {
        let started = Instant::now();
        let outcome = self.try_publish(target).await;
        match &outcome {
            Ok(published) => tracing::info!(
                service = %target.service,
                image = %published.image,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "published image"
            ),
            Err(e) => tracing::warn!(
                service = %target.service,
                stage = ?e.stage(),
                error = %e,
                "publish failed"
            ),
        }
        PublishResult {
            service: target.service.clone(),
            outcome,
        }
    }

    async fn try_publish(&self, target: &DeploymentTarget) -> Result<PublishedImage, PublishError> {
        let host = target.registry_host();
        tracing::debug!(service = %target.service, registry = host, "authenticating");
        let auth = self.registry.authenticate(host).await?;

        let context = load_context(target.context_dir.clone(), target.dockerfile.clone())
            .await
            .map_err(|e| PublishError::build(format!("build context: {}", e)))?;
        let build_args = resolve_env_map(&target.build_args)
            .map_err(|e| PublishError::build(format!("build args: {}", e)))?;

        let local_tag = format!("rollout-{}:{}", target.service, context.short_digest());
        tracing::debug!(
            service = %target.service,
            files = context.file_count(),
            digest = context.short_digest(),
            "building image"
        );
        let built = self
            .registry
            .build(&BuildRequest {
                context: context.archive(),
                dockerfile: target.dockerfile.clone(),
                local_tag: local_tag.clone(),
                build_args,
            })
            .await?;
        tracing::debug!(service = %target.service, id = ?built.id, lines = built.log.len(), "image built");

        let tag = match self.tag_policy {
            TagPolicy::Unique => ImageTag::for_build(Utc::now(), context.short_digest()),
            TagPolicy::Latest => ImageTag::latest(),
        };
        let image = target.repository.with_tag(&tag);
        self.registry.tag(&local_tag, &image).await?;
        let registry_digest = self.registry.push(&image, &auth).await?;

        let mut aliases = Vec::new();
        let mut alias_error = None;
        if self.alias_latest && !tag.is_latest() {
            let alias = target.repository.with_tag(&ImageTag::latest());
            let pushed = match self.registry.tag(&local_tag, &alias).await {
                Ok(()) => self.registry.push(&alias, &auth).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match pushed {
                Ok(()) => aliases.push(alias),
                Err(e) => {
                    tracing::warn!(service = %target.service, alias = %alias, error = %e, "alias push failed");
                    alias_error = Some(e.to_string());
                }
            }
        }

        Ok(PublishedImage {
            image,
            content_digest: context.digest().to_string(),
            registry_digest,
            aliases,
            alias_error,
        })
    }
}
