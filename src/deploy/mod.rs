// ABOUTME: Rollout orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Rollout run, outcomes, and the Orchestrator driver.

mod cancel;
mod orchestrator;
mod outcome;
mod phase;
mod plan;
mod rollout;
mod state;
mod target;

pub use cancel::{CancelHandle, CancelToken};
pub use orchestrator::Orchestrator;
pub use outcome::{DeploymentOutcome, RunFailure, RunReport};
pub use phase::RunPhase;
pub use plan::{PlannedService, RunPlan, plan_run};
pub use rollout::{Rollout, TransitionResult};
pub use state::{Idle, Published, StateLoaded, TriggerAttempt, Triggered, Verified};
pub use target::DeploymentTarget;
