// ABOUTME: Drives one run: read state, publish, trigger, verify, report.
// ABOUTME: Owns failure propagation; per-service errors end up in outcomes, not in Err.

use tracing::Instrument;

use super::outcome::{RunFailure, RunReport};
use super::{CancelToken, Rollout};
use crate::config::Config;
use crate::diagnostics::Warning;
use crate::health::HealthProbe;
use crate::platform::Platform;
use crate::publish::Registry;
use crate::state::StateReader;

/// Wires the collaborators of a run together.
pub struct Orchestrator<'a, S: ?Sized, R: ?Sized, P: ?Sized, H: ?Sized> {
    config: &'a Config,
    state: &'a S,
    registry: &'a R,
    platform: &'a P,
    probe: &'a H,
}

impl<'a, S, R, P, H> Orchestrator<'a, S, R, P, H>
where
    S: StateReader + ?Sized,
    R: Registry + ?Sized,
    P: Platform + ?Sized,
    H: HealthProbe + ?Sized,
{
    pub fn new(config: &'a Config, state: &'a S, registry: &'a R, platform: &'a P, probe: &'a H) -> Self {
        Self {
            config,
            state,
            registry,
            platform,
            probe,
        }
    }

    /// Run the workflow to a terminal phase. Always returns a report.
    pub async fn run(&self, cancel: &CancelToken) -> RunReport {
        let rollout = Rollout::new();
        let span = tracing::info_span!("run", id = %rollout.run_id());
        self.drive(rollout, cancel).instrument(span).await
    }

    async fn drive(&self, rollout: Rollout<super::Idle>, cancel: &CancelToken) -> RunReport {
        let loaded = match rollout.read_state(self.state, self.config).await {
            Ok(loaded) => loaded,
            Err((idle, e)) => return idle.fail(RunFailure::StateUnavailable(e.to_string())),
        };

        let mut published = loaded.publish(self.registry, self.config, cancel).await;
        if published.was_interrupted() {
            published.warn(Warning::interrupted("cancelled before every image was published"));
            return published.fail(RunFailure::Interrupted);
        }
        if !published.any_published() {
            return published.fail(RunFailure::NothingPublished);
        }

        let mut triggered = published.trigger(self.platform, self.config, cancel).await;
        if triggered.was_interrupted() {
            triggered.warn(Warning::interrupted(
                "cancelled before every deployment was triggered",
            ));
        }

        let verified = triggered.verify(self.probe, self.config, cancel).await;
        if !verified.any_triggered() {
            return verified.fail(RunFailure::NothingTriggered);
        }
        verified.finish()
    }
}
