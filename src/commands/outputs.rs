// ABOUTME: Outputs command implementation.
// ABOUTME: Reads the provisioning snapshot and prints it; never mutates anything.

use rollout::config::Config;
use rollout::error::Result;
use rollout::output::Output;
use rollout::state::{OutputSource, read_snapshot};

pub async fn outputs(config: &Config, output: &Output) -> Result<()> {
    let source = OutputSource::from_config(config);
    tracing::debug!(source = %source.describe(), "reading outputs");
    let snapshot = read_snapshot(&source, config).await?;
    output.snapshot(&snapshot);
    Ok(())
}
