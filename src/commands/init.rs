// ABOUTME: Init command implementation.
// ABOUTME: Writes the rollout.yml template for the agent and backend services.

use rollout::config::{CONFIG_FILENAME, init_config};
use rollout::error::Result;
use rollout::output::Output;
use std::path::Path;

pub fn init(dir: &Path, force: bool, output: &Output) -> Result<()> {
    init_config(dir, force)?;
    output.success(&format!("Created {}", dir.join(CONFIG_FILENAME).display()));
    Ok(())
}
