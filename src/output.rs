// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::deploy::{RunPlan, RunReport};
use crate::state::StateSnapshot;
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.event("success", message),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(&self.json_event("error", message)) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the per-service outcome table and overall status.
    pub fn report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Json => self.document("report", report),
            OutputMode::Quiet => {
                for outcome in &report.outcomes {
                    println!("{}\t{}\t{}", outcome.service, outcome.status(), outcome.health);
                }
                println!("{}", report.phase);
            }
            OutputMode::Normal => {
                println!();
                println!(
                    "  {:<16} {:<15} {:<10} IMAGE",
                    "SERVICE", "STATUS", "HEALTH"
                );
                for outcome in &report.outcomes {
                    let image = outcome
                        .image
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "-".to_string());
                    let marker = if outcome.required { "*" } else { " " };
                    println!(
                        "{} {:<16} {:<15} {:<10} {}",
                        marker,
                        outcome.service.as_str(),
                        outcome.status(),
                        outcome.health.to_string(),
                        image
                    );
                    if let Some(error) = outcome.error() {
                        println!("    ✗ {error}");
                    }
                }
                if let Some(health) = &report.health {
                    let url = health.url.as_deref().unwrap_or("-");
                    println!();
                    println!("  health: {} ({url}, {} attempt(s))", health.status, health.attempts);
                }
                for warning in &report.warnings {
                    println!("  ! {}", warning.message);
                }
                println!();
                match &report.failure {
                    None => self.success(&format!("Run {} done", report.run_id)),
                    Some(failure) => println!("Run {} failed: {failure}", report.run_id),
                }
            }
        }
    }

    /// Print what a dry run would do.
    pub fn plan(&self, plan: &RunPlan) {
        if self.mode == OutputMode::Json {
            self.document("plan", plan);
            return;
        }
        println!(
            "Cluster {} ({}), registry {}",
            plan.cluster, plan.region, plan.registry_host
        );
        for service in &plan.services {
            println!(
                "  {} : build {} ({}) → push {}:{} → update {}",
                service.service,
                service.context_dir.display(),
                service.dockerfile,
                service.repository.repository(),
                service.tag,
                service.platform_service.short()
            );
            if !service.secrets.is_empty() {
                println!("      secrets: {}", service.secrets.join(", "));
            }
        }
        match &plan.health_url {
            Some(url) => println!("  verify: GET {url}"),
            None => println!("  verify: skipped (no public endpoint)"),
        }
    }

    /// Print a state snapshot.
    pub fn snapshot(&self, snapshot: &StateSnapshot) {
        if self.mode == OutputMode::Json {
            self.document("outputs", snapshot);
            return;
        }
        println!("cluster         {}", snapshot.cluster);
        println!("region          {}", snapshot.region);
        println!("registry        {}", snapshot.registry_host);
        println!(
            "project         {}",
            snapshot.project.as_deref().unwrap_or("-")
        );
        println!(
            "public endpoint {}",
            snapshot.public_endpoint.as_deref().unwrap_or("-")
        );
        for (name, service) in &snapshot.services {
            println!();
            println!("{name}");
            println!("  repository    {}", service.repository.repository());
            println!("  service       {}", service.service);
            for secret in &service.secrets {
                println!("  secret        {} ← {}", secret.name, secret.value_from.short());
            }
        }
    }

    fn json_event<'a>(&self, event: &'a str, message: &'a str) -> JsonEvent<'a> {
        JsonEvent {
            event,
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        }
    }

    fn event(&self, event: &str, message: &str) {
        if let Ok(json) = serde_json::to_string(&self.json_event(event, message)) {
            println!("{json}");
        }
    }

    fn document<T: Serialize>(&self, event: &str, body: &T) {
        let doc = JsonDocument { event, body };
        match serde_json::to_string(&doc) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to encode {} as JSON", event),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonDocument<'a, T: Serialize> {
    event: &'a str,
    #[serde(flatten)]
    body: &'a T,
}
