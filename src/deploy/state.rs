// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Each state carries the data earlier phases produced, so later phases can't run early.

use super::DeploymentTarget;
use crate::health::HealthReport;
use crate::platform::{TriggerError, TriggerReceipt};
use crate::publish::PublishResult;
use crate::state::StateSnapshot;
use crate::types::ServiceName;

/// Nothing read yet.
/// Available actions: `read_state()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

/// Snapshot read and targets resolved.
/// Available actions: `plan()`, `publish()`
#[derive(Debug)]
pub struct StateLoaded {
    pub(crate) snapshot: StateSnapshot,
    pub(crate) targets: Vec<DeploymentTarget>,
}

/// Every publish finished (or was interrupted).
/// Available actions: `trigger()`, `fail()`
#[derive(Debug)]
pub struct Published {
    pub(crate) snapshot: StateSnapshot,
    pub(crate) targets: Vec<DeploymentTarget>,
    pub(crate) publishes: Vec<PublishResult>,
}

/// Every trigger attempt returned.
/// Available actions: `verify()`
#[derive(Debug)]
pub struct Triggered {
    pub(crate) snapshot: StateSnapshot,
    pub(crate) targets: Vec<DeploymentTarget>,
    pub(crate) publishes: Vec<PublishResult>,
    pub(crate) triggers: Vec<TriggerAttempt>,
}

/// Health verified.
/// Available actions: `finish()`, `fail()`
#[derive(Debug)]
pub struct Verified {
    pub(crate) targets: Vec<DeploymentTarget>,
    pub(crate) publishes: Vec<PublishResult>,
    pub(crate) triggers: Vec<TriggerAttempt>,
    pub(crate) health: HealthReport,
}

/// One service's trigger result.
#[derive(Debug, Clone)]
pub struct TriggerAttempt {
    pub service: ServiceName,
    pub result: Result<TriggerReceipt, TriggerError>,
}

impl TriggerAttempt {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}
