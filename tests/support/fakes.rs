// ABOUTME: In-process fakes that record every external call in one shared log.
// ABOUTME: Lets tests assert counts and ordering across registry, platform, and probe.

use async_trait::async_trait;
use parking_lot::Mutex;
use rollout::deploy::CancelHandle;
use rollout::health::{HealthProbe, HealthUrl, ProbeError};
use rollout::platform::{Platform, TriggerError, TriggerReceipt, UpdateServiceRequest};
use rollout::publish::{BuildRequest, BuiltImage, PublishError, Registry, RegistryAuth};
use rollout::state::{Outputs, StateError, StateReader};
use rollout::types::{ImageRef, TaskDefinitionArn};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadState,
    Authenticate(String),
    Build(String),
    Tag(String),
    Push(String),
    Update(String),
    Probe(String),
}

impl Call {
    pub fn is_registry(&self) -> bool {
        matches!(
            self,
            Call::Authenticate(_) | Call::Build(_) | Call::Tag(_) | Call::Push(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.lock().iter().position(pred)
    }

    pub fn rposition(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.lock().iter().rposition(pred)
    }
}

// =============================================================================
// State reader
// =============================================================================

pub struct FakeState {
    log: CallLog,
    outputs: Option<Outputs>,
}

impl FakeState {
    pub fn new(log: &CallLog, outputs: Outputs) -> Self {
        Self {
            log: log.clone(),
            outputs: Some(outputs),
        }
    }

    /// Behaves like a stack that was never applied.
    pub fn never_applied(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            outputs: None,
        }
    }
}

#[async_trait]
impl StateReader for FakeState {
    async fn read_outputs(&self) -> Result<Outputs, StateError> {
        self.log.record(Call::ReadState);
        match &self.outputs {
            Some(outputs) => Ok(outputs.clone()),
            None => Outputs::from_json("{}"),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct FakeRegistry {
    log: CallLog,
    fail_build: HashSet<String>,
    fail_push: HashSet<String>,
    fail_auth: bool,
    fail_alias: bool,
    build_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRegistry {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    pub fn failing_build(mut self, service: &str) -> Self {
        self.fail_build.insert(service.to_string());
        self
    }

    pub fn failing_push(mut self, service: &str) -> Self {
        self.fail_push.insert(service.to_string());
        self
    }

    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub fn failing_alias(mut self) -> Self {
        self.fail_alias = true;
        self
    }

    pub fn slow_builds(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    pub fn max_concurrent_builds(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn service_of(local_tag: &str) -> String {
        local_tag
            .trim_start_matches("rollout-")
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn service_of_image(image: &ImageRef) -> String {
        image.name().trim_start_matches("parking-").to_string()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn authenticate(&self, host: &str) -> Result<RegistryAuth, PublishError> {
        self.log.record(Call::Authenticate(host.to_string()));
        if self.fail_auth {
            return Err(PublishError::Auth {
                host: host.to_string(),
                message: "token expired".to_string(),
            });
        }
        Ok(RegistryAuth {
            server: host.to_string(),
            username: "AWS".to_string(),
            password: "token".to_string(),
        })
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuiltImage, PublishError> {
        let service = Self::service_of(&request.local_tag);
        self.log.record(Call::Build(service.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_build.contains(&service) {
            return Err(PublishError::Build {
                message: "executor failed running [/bin/sh -c pip install]".to_string(),
                output: vec!["Step 3/5 : RUN pip install -r requirements.txt".to_string()],
            });
        }
        Ok(BuiltImage {
            id: Some(format!("sha256:{service}")),
            log: vec!["Successfully built".to_string()],
        })
    }

    async fn tag(&self, _source: &str, target: &ImageRef) -> Result<(), PublishError> {
        self.log.record(Call::Tag(target.to_string()));
        Ok(())
    }

    async fn push(
        &self,
        image: &ImageRef,
        _auth: &RegistryAuth,
    ) -> Result<Option<String>, PublishError> {
        self.log.record(Call::Push(image.to_string()));
        let service = Self::service_of_image(image);
        let is_alias = image.tag() == Some("latest");
        if self.fail_push.contains(&service) || (is_alias && self.fail_alias) {
            return Err(PublishError::Push {
                image: image.to_string(),
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(Some(format!("sha256:{service}-manifest")))
    }
}

// =============================================================================
// Platform
// =============================================================================

#[derive(Default)]
pub struct FakePlatform {
    log: CallLog,
    reject: HashSet<String>,
    missing: HashSet<String>,
    cancel_on: Option<(String, CancelHandle)>,
    requests: Mutex<Vec<UpdateServiceRequest>>,
}

impl FakePlatform {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    /// Reject updates for the platform service id.
    pub fn rejecting(mut self, platform_service: &str) -> Self {
        self.reject.insert(platform_service.to_string());
        self
    }

    pub fn missing(mut self, platform_service: &str) -> Self {
        self.missing.insert(platform_service.to_string());
        self
    }

    /// Fire `handle` while the update for `platform_service` is in flight.
    pub fn cancelling_on(mut self, platform_service: &str, handle: CancelHandle) -> Self {
        self.cancel_on = Some((platform_service.to_string(), handle));
        self
    }

    pub fn requests(&self) -> Vec<UpdateServiceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn update_service(
        &self,
        request: &UpdateServiceRequest,
    ) -> Result<TriggerReceipt, TriggerError> {
        let id = request.service.as_str().to_string();
        self.log.record(Call::Update(id.clone()));
        self.requests.lock().push(request.clone());
        if let Some((service, handle)) = &self.cancel_on {
            if *service == id {
                handle.cancel();
            }
        }
        tokio::task::yield_now().await;

        if self.missing.contains(&id) {
            return Err(TriggerError::NotFound(format!("service {id}: MISSING")));
        }
        if self.reject.contains(&id) {
            return Err(TriggerError::Rejected("AccessDeniedException".to_string()));
        }
        Ok(TriggerReceipt {
            deployment_id: Some(format!("ecs-svc/{id}")),
            task_definition: Some(TaskDefinitionArn::new(format!(
                "arn:aws:ecs:ap-northeast-1:123456789012:task-definition/{id}:8"
            ))),
            registered: true,
        })
    }
}

// =============================================================================
// Health probe
// =============================================================================

pub struct FakeProbe {
    log: CallLog,
    responses: Mutex<VecDeque<Result<u16, ProbeError>>>,
    fallback: Result<u16, ProbeError>,
}

impl FakeProbe {
    /// Always answers `status`.
    pub fn status(log: &CallLog, status: u16) -> Self {
        Self {
            log: log.clone(),
            responses: Mutex::new(VecDeque::new()),
            fallback: Ok(status),
        }
    }

    /// Answers from `responses` in order, then `fallback`.
    pub fn sequence(
        log: &CallLog,
        responses: Vec<Result<u16, ProbeError>>,
        fallback: Result<u16, ProbeError>,
    ) -> Self {
        Self {
            log: log.clone(),
            responses: Mutex::new(responses.into()),
            fallback,
        }
    }
}

#[async_trait]
impl HealthProbe for FakeProbe {
    async fn get(&self, url: &HealthUrl, _timeout: Duration) -> Result<u16, ProbeError> {
        self.log.record(Call::Probe(url.to_string()));
        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
