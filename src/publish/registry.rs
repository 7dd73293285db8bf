// ABOUTME: Registry abstraction for build, tag, and push.
// ABOUTME: The orchestrator only sees this trait; BollardRegistry talks to the local engine.

use super::PublishError;
use crate::types::ImageRef;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// Credentials for one registry host, obtained once per publish.
#[derive(Clone)]
pub struct RegistryAuth {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to build one service image locally.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tar archive of the build context.
    pub context: Bytes,
    pub dockerfile: String,
    /// Local name for the built image, later tagged into the registry.
    pub local_tag: String,
    pub build_args: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuiltImage {
    /// Engine image id, when the engine reports one.
    pub id: Option<String>,
    /// Build output lines, in order.
    pub log: Vec<String>,
}

/// Image registry and build engine operations.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Obtain push credentials for `host`.
    async fn authenticate(&self, host: &str) -> Result<RegistryAuth, PublishError>;

    async fn build(&self, request: &BuildRequest) -> Result<BuiltImage, PublishError>;

    /// Point `target` at the locally built `source` image.
    async fn tag(&self, source: &str, target: &ImageRef) -> Result<(), PublishError>;

    /// Upload `image`. Returns the registry digest when the registry reports one.
    async fn push(
        &self,
        image: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<String>, PublishError>;
}
