// ABOUTME: Error types for the image publish pipeline.
// ABOUTME: One variant per stage so reports can say where a service stopped.

/// A publish failure. Scoped to one service; never aborts other services.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// Registry credentials could not be obtained or were rejected.
    #[error("registry authentication failed for {host}: {message}")]
    Auth { host: String, message: String },

    /// Build context or image build failed. `output` holds the tail of the build log.
    #[error("image build failed: {message}")]
    Build { message: String, output: Vec<String> },

    /// Tagging the built image for the registry failed.
    #[error("failed to tag {image}: {message}")]
    Tag { image: String, message: String },

    /// Upload rejected by the registry or lost on the network.
    #[error("failed to push {image}: {message}")]
    Push { image: String, message: String },

    /// The run was cancelled before this publish completed.
    #[error("publish interrupted before completion")]
    Interrupted,
}

/// Publish stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Authenticate,
    Build,
    Tag,
    Push,
    Interrupted,
}

impl PublishError {
    pub fn stage(&self) -> PublishStage {
        match self {
            PublishError::Auth { .. } => PublishStage::Authenticate,
            PublishError::Build { .. } => PublishStage::Build,
            PublishError::Tag { .. } => PublishStage::Tag,
            PublishError::Push { .. } => PublishStage::Push,
            PublishError::Interrupted => PublishStage::Interrupted,
        }
    }

    /// Captured build output, empty for non-build failures.
    pub fn build_output(&self) -> &[String] {
        match self {
            PublishError::Build { output, .. } => output,
            _ => &[],
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        PublishError::Build {
            message: message.into(),
            output: Vec::new(),
        }
    }
}
