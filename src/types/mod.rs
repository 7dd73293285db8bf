// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod image_ref;
mod image_tag;
mod service_name;

pub use id::{ClusterId, Id, PlatformServiceId, SecretId, TaskDefinitionArn};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use image_tag::{ImageTag, ImageTagError};
pub use service_name::{ServiceName, ServiceNameError};
