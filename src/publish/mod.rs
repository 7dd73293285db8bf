// ABOUTME: Image publishing: build context, registry operations, and the per-service pipeline.
// ABOUTME: Publish failures stay scoped to their service.

mod bollard;
mod context;
mod error;
mod publisher;
mod registry;

pub use self::bollard::{BollardRegistry, Credentials};
pub use context::{BuildContext, load_context};
pub use error::{PublishError, PublishStage};
pub use publisher::{ImagePublisher, PublishResult, PublishedImage};
pub use registry::{BuildRequest, BuiltImage, Registry, RegistryAuth};
