// ABOUTME: Diagnostics accumulator for non-fatal warnings during a rollout.
// ABOUTME: Collects conditions that don't fail a run but belong in the report.

use crate::types::ServiceName;
use serde::Serialize;

/// Collects non-fatal warnings during a run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        match &warning.service {
            Some(service) => tracing::warn!(service = %service, "{}", warning.message),
            None => tracing::warn!("{}", warning.message),
        }
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceName>,
    pub message: String,
}

impl Warning {
    /// The snapshot has no public endpoint, so health stays unknown.
    pub fn missing_endpoint() -> Self {
        Self {
            kind: WarningKind::MissingEndpoint,
            service: None,
            message: "no public endpoint in provisioning outputs; health not verified".into(),
        }
    }

    pub fn health_probe(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HealthProbe,
            service: None,
            message: message.into(),
        }
    }

    /// The `latest` alias could not be pushed; the unique tag was.
    pub fn alias_push(service: &ServiceName, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::AliasPush,
            service: Some(service.clone()),
            message: message.into(),
        }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Interrupted,
            service: None,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// No public endpoint to verify.
    MissingEndpoint,
    /// Health probe did not report healthy.
    HealthProbe,
    /// `latest` alias push failed.
    AliasPush,
    /// Run cancelled by signal.
    Interrupted,
}
