// ABOUTME: Config and provisioning-output fixtures for the agent + backend pair.
// ABOUTME: Build contexts live in a temp dir so publishes archive real files.

use rollout::config::Config;
use rollout::state::Outputs;
use std::fs;
use tempfile::TempDir;

pub const REGISTRY: &str = "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com";
pub const ENDPOINT: &str = "agent-alb-1234.ap-northeast-1.elb.amazonaws.com";

pub const CONFIG_YAML: &str = r#"
project: parking
services:
  - name: agent
    registry_output: agent_ecr_repository_url
    service_output: agent_service_name
    required: true
    secrets:
      OPENAI_API_KEY: openai_api_key_secret_arn
  - name: backend
    registry_output: backend_ecr_repository_url
    service_output: backend_service_name
    secrets:
      TDX_APP_ID:
        arn: arn:aws:secretsmanager:ap-northeast-1:123456789012:secret:tdx-app-id
"#;

/// A project directory with `agent/` and `backend/` build contexts.
pub struct Project {
    pub dir: TempDir,
    pub config: Config,
}

impl Project {
    pub fn new() -> Self {
        Self::with_yaml(CONFIG_YAML)
    }

    pub fn with_yaml(yaml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for service in ["agent", "backend"] {
            let context = dir.path().join(service);
            fs::create_dir_all(&context).unwrap();
            fs::write(context.join("Dockerfile"), format!("FROM python:3.12-slim\nLABEL svc={service}\n")).unwrap();
            fs::write(context.join("main.py"), format!("print('{service}')\n")).unwrap();
        }
        let mut config = Config::from_yaml(yaml).unwrap();
        config.root = dir.path().to_path_buf();
        Self { dir, config }
    }
}

pub fn output_pairs() -> Vec<(&'static str, String)> {
    vec![
        ("ecs_cluster_name", "parking-cluster".to_string()),
        ("aws_region", "ap-northeast-1".to_string()),
        ("alb_dns_name", ENDPOINT.to_string()),
        ("project_name", "parking".to_string()),
        ("agent_ecr_repository_url", format!("{REGISTRY}/parking-agent")),
        ("agent_service_name", "parking-agent".to_string()),
        ("backend_ecr_repository_url", format!("{REGISTRY}/parking-backend")),
        ("backend_service_name", "parking-backend".to_string()),
        (
            "openai_api_key_secret_arn",
            "arn:aws:secretsmanager:ap-northeast-1:123456789012:secret:openai".to_string(),
        ),
    ]
}

pub fn outputs() -> Outputs {
    Outputs::from_pairs(output_pairs())
}

pub fn outputs_without(key: &str) -> Outputs {
    Outputs::from_pairs(output_pairs().into_iter().filter(|(k, _)| *k != key))
}

/// `terraform output -json` document for the same outputs, plus one sensitive value.
pub fn outputs_json() -> String {
    let mut doc = serde_json::Map::new();
    for (key, value) in output_pairs() {
        doc.insert(
            key.to_string(),
            serde_json::json!({ "sensitive": false, "type": "string", "value": value }),
        );
    }
    doc.insert(
        "db_password".to_string(),
        serde_json::json!({ "sensitive": true, "type": "string", "value": "hunter2" }),
    );
    serde_json::Value::Object(doc).to_string()
}
