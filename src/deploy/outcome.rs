// ABOUTME: Per-service outcomes and the run report.
// ABOUTME: Errors are attached to the service they belong to, never thrown past the driver.

use super::state::TriggerAttempt;
use super::{DeploymentTarget, RunPhase};
use crate::diagnostics::Warning;
use crate::error::{Error, Result};
use crate::health::{HealthReport, HealthStatus};
use crate::platform::TriggerError;
use crate::publish::{PublishError, PublishResult};
use crate::types::{ImageRef, ServiceName, TaskDefinitionArn};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub service: ServiceName,
    pub image: Option<ImageRef>,
    pub content_digest: Option<String>,
    pub triggered: bool,
    pub deployment_id: Option<String>,
    pub task_definition: Option<TaskDefinitionArn>,
    pub health: HealthStatus,
    #[serde(serialize_with = "display_opt")]
    pub publish_error: Option<PublishError>,
    #[serde(serialize_with = "display_opt")]
    pub trigger_error: Option<TriggerError>,
    pub required: bool,
}

impl DeploymentOutcome {
    /// Published and triggered.
    pub fn deployed(&self) -> bool {
        self.triggered
    }

    /// Short status word for tables.
    pub fn status(&self) -> &'static str {
        match (&self.publish_error, &self.trigger_error) {
            (Some(PublishError::Interrupted), _) | (_, Some(TriggerError::Interrupted)) => {
                "interrupted"
            }
            (Some(_), _) => "publish failed",
            (None, Some(_)) => "trigger failed",
            (None, None) if self.triggered => "triggered",
            (None, None) => "published",
        }
    }

    /// The first error for this service, in stage order.
    pub fn error(&self) -> Option<String> {
        self.publish_error
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.trigger_error.as_ref().map(ToString::to_string))
    }
}

fn display_opt<T: fmt::Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

/// Join targets, publish results, and trigger attempts into one outcome per service.
///
/// `health` applies to triggered services only; the rest stay `unknown`.
pub(crate) fn assemble_outcomes(
    targets: &[DeploymentTarget],
    publishes: &[PublishResult],
    triggers: &[TriggerAttempt],
    health: HealthStatus,
) -> Vec<DeploymentOutcome> {
    targets
        .iter()
        .map(|target| {
            let publish = publishes.iter().find(|p| p.service == target.service);
            let trigger = triggers.iter().find(|t| t.service == target.service);

            let (image, content_digest, publish_error) = match publish.map(|p| &p.outcome) {
                Some(Ok(published)) => (
                    Some(published.image.clone()),
                    Some(published.content_digest.clone()),
                    None,
                ),
                Some(Err(e)) => (None, None, Some(e.clone())),
                None => (None, None, None),
            };
            let (receipt, trigger_error) = match trigger.map(|t| &t.result) {
                Some(Ok(receipt)) => (Some(receipt), None),
                Some(Err(e)) => (None, Some(e.clone())),
                None => (None, None),
            };
            let triggered = receipt.is_some();

            DeploymentOutcome {
                service: target.service.clone(),
                image,
                content_digest,
                triggered,
                deployment_id: receipt.and_then(|r| r.deployment_id.clone()),
                task_definition: receipt.and_then(|r| r.task_definition.clone()),
                health: if triggered { health } else { HealthStatus::Unknown },
                publish_error,
                trigger_error,
                required: target.required,
            }
        })
        .collect()
}

/// Why a run ended `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RunFailure {
    StateUnavailable(String),
    NothingPublished,
    NothingTriggered,
    Interrupted,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::StateUnavailable(reason) => {
                write!(f, "provisioning state unavailable: {}", reason)
            }
            RunFailure::NothingPublished => f.write_str("no service image was published"),
            RunFailure::NothingTriggered => f.write_str("no deployment was triggered"),
            RunFailure::Interrupted => f.write_str("run interrupted"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `Done` or `Failed`.
    pub phase: RunPhase,
    /// Phase the run was in when it failed.
    pub failed_during: Option<RunPhase>,
    pub failure: Option<RunFailure>,
    pub outcomes: Vec<DeploymentOutcome>,
    pub health: Option<HealthReport>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    pub fn is_done(&self) -> bool {
        self.phase == RunPhase::Done
    }

    pub fn outcome(&self, service: &str) -> Option<&DeploymentOutcome> {
        self.outcomes.iter().find(|o| o.service.as_str() == service)
    }

    /// Required services that did not get deployed.
    pub fn failed_required(&self) -> Vec<&ServiceName> {
        self.outcomes
            .iter()
            .filter(|o| o.required && !o.deployed())
            .map(|o| &o.service)
            .collect()
    }

    /// Ok only when the run is `Done` and every required service deployed.
    pub fn exit_status(&self) -> Result<()> {
        if let Some(failure) = &self.failure {
            return Err(Error::RunFailed(failure.to_string()));
        }
        let failed = self.failed_required();
        if !failed.is_empty() {
            return Err(Error::RequiredServicesFailed(
                failed.iter().map(|s| s.to_string()).collect(),
            ));
        }
        Ok(())
    }
}
