// ABOUTME: State reader error types with SNAFU context selectors.
// ABOUTME: Every variant means the provisioning state is unusable for this run.

use snafu::Snafu;
use std::path::PathBuf;

use crate::process::CommandError;
use crate::types::{ParseImageRefError, ServiceName};

/// Why a snapshot could not be produced. All variants are fatal to a run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StateError {
    #[snafu(display("no provisioning outputs recorded (has the stack been applied?)"))]
    NoOutputs,

    #[snafu(display("failed to query provisioning outputs: {source}"))]
    Query { source: CommandError },

    #[snafu(display("failed to read outputs file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("malformed provisioning outputs: {source}"))]
    Parse { source: serde_json::Error },

    #[snafu(display("required output '{key}' is missing{}", service_suffix(service)))]
    MissingOutput {
        key: String,
        service: Option<ServiceName>,
    },

    #[snafu(display("output '{key}' is not a valid image repository: {source}"))]
    InvalidRepository {
        key: String,
        source: ParseImageRefError,
    },
}

fn service_suffix(service: &Option<ServiceName>) -> String {
    service
        .as_ref()
        .map(|s| format!(" (service {s})"))
        .unwrap_or_default()
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorKind {
    /// The provisioning layer has never recorded outputs.
    NeverApplied,
    /// Outputs exist but could not be fetched or decoded.
    Unreadable,
    /// Outputs were read but a value a later step needs is absent or invalid.
    Incomplete,
}

impl StateError {
    pub fn kind(&self) -> StateErrorKind {
        match self {
            StateError::NoOutputs => StateErrorKind::NeverApplied,
            StateError::Query { .. } | StateError::ReadFile { .. } | StateError::Parse { .. } => {
                StateErrorKind::Unreadable
            }
            StateError::MissingOutput { .. } | StateError::InvalidRepository { .. } => {
                StateErrorKind::Incomplete
            }
        }
    }
}
