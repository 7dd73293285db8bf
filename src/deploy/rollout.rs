// ABOUTME: A rollout run parameterized by its state, with the phase transitions.
// ABOUTME: Each transition consumes self; verification is only reachable after the trigger barrier.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::Instrument;

use super::outcome::{RunFailure, RunReport, assemble_outcomes};
use super::plan::RunPlan;
use super::state::{Idle, Published, StateLoaded, TriggerAttempt, Triggered, Verified};
use super::{CancelToken, DeploymentTarget, RunPhase};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::health::{self, HealthProbe, HealthReport, HealthStatus};
use crate::platform::{Platform, TriggerError};
use crate::publish::{ImagePublisher, PublishError, PublishResult, Registry};
use crate::state::{StateError, StateReader, StateSnapshot, read_snapshot};

/// Result type for transitions that can fail; the error comes back with the unchanged run.
pub type TransitionResult<T, S, E> = Result<Rollout<T>, (Rollout<S>, E)>;

/// One run of the workflow, parameterized by its current state.
///
/// The state type `S` carries what earlier phases produced, so a later phase
/// cannot be called without the data it depends on.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(crate) run_id: String,
    pub(crate) host: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) phase: RunPhase,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) state: S,
}

impl<S> Rollout<S> {
    fn transition<T>(self, phase: RunPhase, state: T) -> Rollout<T> {
        Rollout {
            run_id: self.run_id,
            host: self.host,
            started_at: self.started_at,
            phase,
            diagnostics: self.diagnostics,
            state,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        tracing::info!(run = %self.run_id, %phase, "phase started");
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn warn(&mut self, warning: Warning) {
        self.diagnostics.warn(warning);
    }

    fn into_report(
        self,
        failure: Option<RunFailure>,
        outcomes: Vec<super::DeploymentOutcome>,
        health: Option<HealthReport>,
    ) -> RunReport {
        let (phase, failed_during) = match failure {
            Some(_) => (RunPhase::Failed, Some(self.phase)),
            None => (RunPhase::Done, None),
        };
        tracing::info!(run = %self.run_id, %phase, "run finished");
        RunReport {
            run_id: self.run_id,
            host: self.host,
            started_at: self.started_at,
            finished_at: Utc::now(),
            phase,
            failed_during,
            failure,
            outcomes,
            health,
            warnings: self.diagnostics.into_warnings(),
        }
    }
}

impl Default for Rollout<Idle> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Idle -> StateLoaded
// =============================================================================

impl Rollout<Idle> {
    pub fn new() -> Self {
        let started_at = Utc::now();
        Rollout {
            run_id: format!("{}-{}", started_at.format("%Y%m%d%H%M%S"), std::process::id()),
            host: gethostname::gethostname().to_string_lossy().into_owned(),
            started_at,
            phase: RunPhase::Idle,
            diagnostics: Diagnostics::default(),
            state: Idle,
        }
    }

    /// Read the provisioning snapshot once and resolve every target.
    pub async fn read_state<R>(
        mut self,
        reader: &R,
        config: &Config,
    ) -> TransitionResult<StateLoaded, Idle, StateError>
    where
        R: StateReader + ?Sized,
    {
        self.enter(RunPhase::ReadingState);
        match read_snapshot(reader, config).await {
            Ok(snapshot) => {
                let targets = DeploymentTarget::resolve_all(config, &snapshot);
                tracing::debug!(
                    cluster = %snapshot.cluster,
                    region = %snapshot.region,
                    services = targets.len(),
                    "state loaded"
                );
                let phase = self.phase;
                Ok(self.transition(phase, StateLoaded { snapshot, targets }))
            }
            Err(e) => {
                tracing::error!(kind = ?e.kind(), error = %e, "state read failed");
                Err((self, e))
            }
        }
    }

    /// End the run before anything was attempted.
    pub fn fail(self, failure: RunFailure) -> RunReport {
        self.into_report(Some(failure), Vec::new(), None)
    }
}

// =============================================================================
// StateLoaded -> Published
// =============================================================================

impl Rollout<StateLoaded> {
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.state.snapshot
    }

    pub fn targets(&self) -> &[DeploymentTarget] {
        &self.state.targets
    }

    pub fn plan(&self, config: &Config) -> RunPlan {
        RunPlan::new(
            &self.state.snapshot,
            &self.state.targets,
            config.registry.tag,
            &config.health.path,
        )
    }

    /// Publish every target, at most `concurrency.builds` at a time.
    ///
    /// On cancellation in-flight publishes are dropped and every service
    /// without a result is recorded as interrupted.
    pub async fn publish<R>(
        mut self,
        registry: &R,
        config: &Config,
        cancel: &CancelToken,
    ) -> Rollout<Published>
    where
        R: Registry + ?Sized,
    {
        self.enter(RunPhase::Publishing);
        let publisher = ImagePublisher::new(registry, &config.registry);
        let targets = &self.state.targets;
        let mut results: Vec<PublishResult> = Vec::with_capacity(targets.len());

        {
            let mut pending = stream::iter(targets.iter())
                .map(|target| {
                    let span = tracing::info_span!("publish", service = %target.service);
                    publisher.publish(target).instrument(span)
                })
                .buffer_unordered(config.concurrency.builds.max(1));

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::warn!("cancelled during publishing");
                        break;
                    }
                    next = pending.next() => match next {
                        Some(result) => results.push(result),
                        None => break,
                    },
                }
            }
        }

        for target in targets {
            if !results.iter().any(|r| r.service == target.service) {
                results.push(PublishResult::interrupted(target.service.clone()));
            }
        }
        results.sort_by_key(|r| targets.iter().position(|t| t.service == r.service));

        for result in &results {
            if let Ok(published) = &result.outcome {
                if let Some(message) = &published.alias_error {
                    self.warn(Warning::alias_push(&result.service, message.clone()));
                }
            }
        }

        let StateLoaded { snapshot, targets } = self.state;
        Rollout {
            run_id: self.run_id,
            host: self.host,
            started_at: self.started_at,
            phase: self.phase,
            diagnostics: self.diagnostics,
            state: Published {
                snapshot,
                targets,
                publishes: results,
            },
        }
    }
}

// =============================================================================
// Published -> Triggered
// =============================================================================

impl Rollout<Published> {
    pub fn publishes(&self) -> &[PublishResult] {
        &self.state.publishes
    }

    pub fn any_published(&self) -> bool {
        self.state.publishes.iter().any(PublishResult::is_success)
    }

    pub fn was_interrupted(&self) -> bool {
        self.state
            .publishes
            .iter()
            .any(|p| matches!(p.outcome, Err(PublishError::Interrupted)))
    }

    /// Trigger every successfully published service, at most
    /// `concurrency.triggers` at a time. Returns once every attempt returned.
    ///
    /// Attempts not yet started when cancellation fires are not issued and
    /// are recorded as interrupted; accepted deployments are unaffected.
    pub async fn trigger<P>(
        mut self,
        platform: &P,
        config: &Config,
        cancel: &CancelToken,
    ) -> Rollout<Triggered>
    where
        P: Platform + ?Sized,
    {
        self.enter(RunPhase::Triggering);
        let snapshot = &self.state.snapshot;
        let jobs = self.state.publishes.iter().filter_map(|p| {
            p.outcome
                .as_ref()
                .ok()
                .map(|published| (p.service.clone(), published.image.clone()))
        });

        let mut triggers: Vec<TriggerAttempt> = stream::iter(jobs)
            .map(|(service, image)| async move {
                let result = if cancel.is_cancelled() {
                    Err(TriggerError::Interrupted)
                } else {
                    let span = tracing::info_span!("trigger", service = %service);
                    crate::platform::trigger(platform, snapshot, &service, &image)
                        .instrument(span)
                        .await
                };
                if let Err(e) = &result {
                    tracing::warn!(service = %service, error = %e, "trigger failed");
                }
                TriggerAttempt { service, result }
            })
            .buffer_unordered(config.concurrency.triggers.max(1))
            .collect()
            .await;

        let targets = &self.state.targets;
        triggers.sort_by_key(|t| targets.iter().position(|target| target.service == t.service));

        let phase = self.phase;
        let Published {
            snapshot,
            targets,
            publishes,
        } = self.state;
        Rollout {
            run_id: self.run_id,
            host: self.host,
            started_at: self.started_at,
            phase,
            diagnostics: self.diagnostics,
            state: Triggered {
                snapshot,
                targets,
                publishes,
                triggers,
            },
        }
    }

    /// End the run without triggering anything.
    pub fn fail(self, failure: RunFailure) -> RunReport {
        let outcomes = assemble_outcomes(
            &self.state.targets,
            &self.state.publishes,
            &[],
            HealthStatus::Unknown,
        );
        self.into_report(Some(failure), outcomes, None)
    }
}

// =============================================================================
// Triggered -> Verified
// =============================================================================

impl Rollout<Triggered> {
    pub fn triggers(&self) -> &[TriggerAttempt] {
        &self.state.triggers
    }

    pub fn any_triggered(&self) -> bool {
        self.state.triggers.iter().any(TriggerAttempt::succeeded)
    }

    pub fn was_interrupted(&self) -> bool {
        self.state
            .triggers
            .iter()
            .any(|t| matches!(t.result, Err(TriggerError::Interrupted)))
    }

    /// Verify the public endpoint once, under the configured policy.
    ///
    /// Runs whether or not any trigger was accepted; health is attributed
    /// to triggered services only.
    pub async fn verify<H>(
        mut self,
        probe: &H,
        config: &Config,
        cancel: &CancelToken,
    ) -> Rollout<Verified>
    where
        H: HealthProbe + ?Sized,
    {
        self.enter(RunPhase::Verifying);
        let endpoint = self.state.snapshot.public_endpoint.clone();
        if endpoint.is_none() {
            self.warn(Warning::missing_endpoint());
        }

        let report = health::verify(probe, endpoint.as_deref(), &config.health, cancel)
            .instrument(tracing::info_span!("verify"))
            .await;
        if report.status == HealthStatus::Unhealthy {
            let url = report.url.as_deref().unwrap_or("endpoint");
            let detail = report.detail.as_deref().unwrap_or("not healthy");
            self.warn(Warning::health_probe(format!("{} unhealthy: {}", url, detail)));
        }

        let phase = self.phase;
        let Triggered {
            targets,
            publishes,
            triggers,
            ..
        } = self.state;
        Rollout {
            run_id: self.run_id,
            host: self.host,
            started_at: self.started_at,
            phase,
            diagnostics: self.diagnostics,
            state: Verified {
                targets,
                publishes,
                triggers,
                health: report,
            },
        }
    }

}

// =============================================================================
// Verified -> report
// =============================================================================

impl Rollout<Verified> {
    pub fn health(&self) -> &HealthReport {
        &self.state.health
    }

    pub fn any_triggered(&self) -> bool {
        self.state.triggers.iter().any(TriggerAttempt::succeeded)
    }

    pub fn finish(self) -> RunReport {
        self.conclude(None)
    }

    /// End the run `Failed`, keeping the verification result.
    pub fn fail(self, failure: RunFailure) -> RunReport {
        self.conclude(Some(failure))
    }

    fn conclude(self, failure: Option<RunFailure>) -> RunReport {
        let outcomes = assemble_outcomes(
            &self.state.targets,
            &self.state.publishes,
            &self.state.triggers,
            self.state.health.status,
        );
        let health = Some(self.state.health.clone());
        self.into_report(failure, outcomes, health)
    }
}
