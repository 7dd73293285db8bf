// ABOUTME: Provisioning-layer state: outputs, sources, and the per-run snapshot.
// ABOUTME: Pure reads; nothing here mutates remote state.

mod error;
mod outputs;
mod reader;
mod snapshot;

pub use error::{StateError, StateErrorKind};
pub use outputs::Outputs;
pub use reader::{OutputSource, OutputsFile, StateReader, TerraformOutputs};
pub use snapshot::{SecretRef, ServiceOutputs, StateSnapshot, read_snapshot};
