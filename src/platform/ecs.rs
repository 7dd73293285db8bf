// ABOUTME: ECS implementation of the deployment trigger via the aws CLI.
// ABOUTME: Registers a task definition revision for the new image, then forces a new deployment.

use super::{Platform, TriggerError, TriggerReceipt, UpdateServiceRequest};
use crate::aws::AwsCli;
use crate::config::PlatformConfig;
use crate::process::CommandError;
use crate::state::SecretRef;
use crate::types::{ImageRef, TaskDefinitionArn};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Task definition fields accepted by `register-task-definition`.
const REGISTRABLE_FIELDS: &[&str] = &[
    "family",
    "taskRoleArn",
    "executionRoleArn",
    "networkMode",
    "containerDefinitions",
    "volumes",
    "placementConstraints",
    "requiresCompatibilities",
    "cpu",
    "memory",
    "pidMode",
    "ipcMode",
    "proxyConfiguration",
    "inferenceAccelerators",
    "ephemeralStorage",
    "runtimePlatform",
];

const NOT_FOUND_MARKERS: &[&str] = &["ServiceNotFoundException", "ClusterNotFoundException"];

pub struct EcsPlatform {
    config: PlatformConfig,
}

impl EcsPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        Self { config }
    }

    async fn current_task_definition(
        &self,
        aws: &AwsCli,
        request: &UpdateServiceRequest,
    ) -> Result<String, TriggerError> {
        let out = aws
            .json(
                "ecs",
                "describe-services",
                [
                    "--cluster",
                    request.cluster.as_str(),
                    "--services",
                    request.service.as_str(),
                ],
            )
            .await
            .map_err(classify)?;

        if let Some(failure) = out["failures"].as_array().and_then(|f| f.first()) {
            let reason = failure["reason"].as_str().unwrap_or("unknown");
            let message = format!("service {}: {}", request.service, reason);
            return Err(if reason == "MISSING" {
                TriggerError::NotFound(message)
            } else {
                TriggerError::Rejected(message)
            });
        }

        let service = out["services"]
            .as_array()
            .and_then(|s| s.first())
            .ok_or_else(|| TriggerError::NotFound(format!("service {}", request.service)))?;
        let status = service["status"].as_str().unwrap_or_default();
        if status != "ACTIVE" {
            return Err(TriggerError::NotFound(format!(
                "service {} is {}",
                request.service,
                if status.is_empty() { "unknown" } else { status }
            )));
        }
        service["taskDefinition"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TriggerError::Rejected("service has no task definition".into()))
    }

    async fn register(&self, aws: &AwsCli, body: &Value) -> Result<String, TriggerError> {
        let input = serde_json::to_string(body)
            .map_err(|e| TriggerError::Rejected(format!("task definition encoding: {}", e)))?;
        let out = aws
            .json("ecs", "register-task-definition", ["--cli-input-json".to_string(), input])
            .await
            .map_err(classify)?;
        out["taskDefinition"]["taskDefinitionArn"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TriggerError::Rejected("registration returned no ARN".into()))
    }
}

#[async_trait]
impl Platform for EcsPlatform {
    async fn update_service(
        &self,
        request: &UpdateServiceRequest,
    ) -> Result<TriggerReceipt, TriggerError> {
        let aws = AwsCli::new(&self.config, request.region.as_str());
        let current = self.current_task_definition(&aws, request).await?;
        tracing::debug!(service = %request.service, task_definition = %current, "current task definition");

        let described = aws
            .json("ecs", "describe-task-definition", ["--task-definition", current.as_str()])
            .await
            .map_err(classify)?;
        let rewrite = rewrite_task_definition(
            &described["taskDefinition"],
            &request.repository,
            &request.image,
            &request.secrets,
        )?;

        let (task_definition, registered) = if rewrite.changed {
            (self.register(&aws, &rewrite.body).await?, true)
        } else {
            tracing::debug!(service = %request.service, "task definition already current");
            (current, false)
        };

        let mut args = vec![
            "--cluster".to_string(),
            request.cluster.to_string(),
            "--service".to_string(),
            request.service.to_string(),
            "--task-definition".to_string(),
            task_definition.clone(),
        ];
        if request.force_new_deployment {
            args.push("--force-new-deployment".to_string());
        }
        let out = aws
            .json("ecs", "update-service", args)
            .await
            .map_err(classify)?;

        let deployment_id = out["service"]["deployments"].as_array().and_then(|deployments| {
            deployments
                .iter()
                .find(|d| d["status"] == "PRIMARY")
                .and_then(|d| d["id"].as_str())
                .map(str::to_string)
        });

        Ok(TriggerReceipt {
            deployment_id,
            task_definition: Some(TaskDefinitionArn::new(task_definition)),
            registered,
        })
    }
}

/// A registrable task definition body and whether it differs from the current one.
#[derive(Debug, Clone)]
pub struct TaskDefinitionRewrite {
    pub body: Value,
    pub changed: bool,
}

/// Point containers pulling from `repository` at `image` and merge `secrets` by name.
///
/// Only fields `register-task-definition` accepts are kept.
pub fn rewrite_task_definition(
    current: &Value,
    repository: &ImageRef,
    image: &ImageRef,
    secrets: &[SecretRef],
) -> Result<TaskDefinitionRewrite, TriggerError> {
    let source = current
        .as_object()
        .ok_or_else(|| TriggerError::Rejected("task definition is not an object".into()))?;
    let mut body: Map<String, Value> = REGISTRABLE_FIELDS
        .iter()
        .filter_map(|field| {
            source
                .get(*field)
                .filter(|v| !v.is_null())
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect();

    let containers = body
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| TriggerError::Rejected("task definition has no containers".into()))?;

    let new_image = image.to_string();
    let mut matched = false;
    let mut changed = false;
    for container in containers.iter_mut() {
        let uses_repository = container["image"]
            .as_str()
            .and_then(|s| ImageRef::parse(s).ok())
            .is_some_and(|current| current.same_repository(repository));
        if !uses_repository {
            continue;
        }
        matched = true;
        if container["image"].as_str() != Some(new_image.as_str()) {
            container["image"] = Value::String(new_image.clone());
            changed = true;
        }
        changed |= merge_secrets(container, secrets);
    }

    if !matched {
        return Err(TriggerError::Rejected(format!(
            "no container in the task definition uses {}",
            repository.repository()
        )));
    }

    Ok(TaskDefinitionRewrite {
        body: Value::Object(body),
        changed,
    })
}

fn merge_secrets(container: &mut Value, secrets: &[SecretRef]) -> bool {
    if secrets.is_empty() {
        return false;
    }
    if !container["secrets"].is_array() {
        container["secrets"] = json!([]);
    }
    let Some(existing) = container["secrets"].as_array_mut() else {
        return false;
    };

    let mut changed = false;
    for secret in secrets {
        let entry = json!({ "name": secret.name, "valueFrom": secret.value_from.as_str() });
        match existing.iter_mut().find(|e| e["name"] == secret.name.as_str()) {
            Some(current) if *current == entry => {}
            Some(current) => {
                *current = entry;
                changed = true;
            }
            None => {
                existing.push(entry);
                changed = true;
            }
        }
    }
    changed
}

fn classify(err: CommandError) -> TriggerError {
    let message = err.to_string();
    let stderr = err.stderr();
    let not_found = NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker));
    if not_found {
        TriggerError::NotFound(message)
    } else {
        TriggerError::Rejected(message)
    }
}
