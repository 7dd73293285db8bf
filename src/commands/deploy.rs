// ABOUTME: Deploy command implementation.
// ABOUTME: Wires the real state reader, Docker registry, ECS platform, and HTTP probe into a run.

use rollout::config::Config;
use rollout::deploy::{CancelToken, Orchestrator, plan_run};
use rollout::error::{Error, Result};
use rollout::health::HttpProbe;
use rollout::output::Output;
use rollout::platform::EcsPlatform;
use rollout::publish::{BollardRegistry, Credentials};
use rollout::state::OutputSource;

/// Run the full workflow, or print the plan on `dry_run`.
pub async fn deploy(
    config: Config,
    dry_run: bool,
    mut output: Output,
    cancel: CancelToken,
) -> Result<()> {
    output.start_timer();
    let source = OutputSource::from_config(&config);
    output.progress(&format!(
        "Reading provisioning outputs from {}",
        source.describe()
    ));

    if dry_run {
        let plan = plan_run(&source, &config).await?;
        output.plan(&plan);
        return Ok(());
    }

    let credentials = Credentials::from_config(&config.registry.auth, &config.platform);
    let registry =
        BollardRegistry::connect_local(credentials).map_err(|e| Error::Engine(e.to_string()))?;
    let platform = EcsPlatform::new(config.platform.clone());
    let probe = HttpProbe::new();
    let orchestrator = Orchestrator::new(&config, &source, &registry, &platform, &probe);

    output.progress(&format!(
        "Deploying {} service(s): {}",
        config.services.len(),
        config
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    let report = orchestrator.run(&cancel).await;
    output.report(&report);
    report.exit_status()
}
