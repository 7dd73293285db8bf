// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a rollout.yml for the agent + parking MCP backend pair.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(())
}

pub const TEMPLATE: &str = r#"# Deployment settings for rollout.
# Identifiers come from `terraform output -json` in state.terraform_dir.

services:
  - name: agent
    context: agent
    registry_output: agent_ecr_repository_url
    service_output: agent_service_name
    required: true
    secrets:
      OPENAI_API_KEY: openai_api_key_secret_arn
      LINE_CHANNEL_ACCESS_TOKEN: line_channel_access_token_secret_arn

  - name: backend
    context: parking_mcp_server
    registry_output: parking_mcp_ecr_repository_url
    service_output: parking_mcp_service_name
    secrets:
      TDX_APP_ID: tdx_app_id_secret_arn
      TDX_APP_KEY: tdx_app_key_secret_arn

state:
  terraform_dir: infra
  # outputs_file: outputs.json

registry:
  tag: unique
  alias_latest: true

health:
  path: /health
  timeout: 10s
  policy:
    mode: once

concurrency:
  builds: 2
  triggers: 4
"#;
