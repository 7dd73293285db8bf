// ABOUTME: Thin wrapper around the aws CLI for ECR login and ECS calls.
// ABOUTME: Applies region, profile, and JSON output to every invocation.

use crate::config::PlatformConfig;
use crate::process::{CommandError, CommandSpec};

#[derive(Debug, Clone)]
pub struct AwsCli {
    bin: String,
    region: String,
    profile: Option<String>,
}

impl AwsCli {
    pub fn new(config: &PlatformConfig, region: impl Into<String>) -> Self {
        Self {
            bin: config.aws_bin.clone(),
            region: region.into(),
            profile: config.profile.clone(),
        }
    }

    /// Build an invocation: `aws <service> <operation> <args> --region R [--profile P]`.
    pub fn command<I, S>(&self, service: &str, operation: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = CommandSpec::new(&self.bin)
            .args([service, operation])
            .args(args)
            .args(["--region", self.region.as_str()])
            .env("AWS_PAGER", "");
        if let Some(ref profile) = self.profile {
            spec = spec.args(["--profile", profile.as_str()]);
        }
        spec
    }

    pub async fn json<I, S>(
        &self,
        service: &str,
        operation: &str,
        args: I,
    ) -> Result<serde_json::Value, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command(service, operation, args)
            .args(["--output", "json"])
            .json()
            .await
    }

    /// Registry password from `aws ecr get-login-password`.
    pub async fn ecr_login_password(&self) -> Result<String, CommandError> {
        let out = self
            .command("ecr", "get-login-password", std::iter::empty::<String>())
            .output()
            .await?;
        Ok(out.trim().to_string())
    }
}
