// ABOUTME: Registry implementation backed by the local Docker engine via bollard.
// ABOUTME: ECR credentials come from the aws CLI; basic credentials from config.

use super::registry::{BuildRequest, BuiltImage, Registry, RegistryAuth};
use super::PublishError;
use crate::aws::AwsCli;
use crate::config::{EnvValue, PlatformConfig, RegistryAuthConfig};
use crate::types::ImageRef;
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::query_parameters::{BuildImageOptions, PushImageOptions, TagImageOptions};
use futures::StreamExt;
use http_body_util::{Either, Full};

const ECR_USERNAME: &str = "AWS";
/// Build output lines kept on failure.
const BUILD_LOG_TAIL: usize = 40;

#[derive(Debug, Clone)]
pub enum Credentials {
    /// `aws ecr get-login-password`, region taken from the registry host.
    Ecr(PlatformConfig),
    Basic { username: String, password: EnvValue },
}

impl Credentials {
    pub fn from_config(auth: &RegistryAuthConfig, platform: &PlatformConfig) -> Self {
        match auth {
            RegistryAuthConfig::Ecr => Credentials::Ecr(platform.clone()),
            RegistryAuthConfig::Basic { username, password } => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
        }
    }
}

pub struct BollardRegistry {
    client: Docker,
    credentials: Credentials,
}

impl BollardRegistry {
    pub fn new(client: Docker, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Connect to the engine through DOCKER_HOST or the platform default socket.
    pub fn connect_local(credentials: Credentials) -> Result<Self, bollard::errors::Error> {
        let client = Docker::connect_with_local_defaults()?;
        Ok(Self::new(client, credentials))
    }

    async fn local_image_id(&self, name: &str) -> Option<String> {
        match self.client.inspect_image(name).await {
            Ok(inspect) => inspect.id,
            Err(e) => {
                tracing::debug!(image = name, error = %e, "could not inspect built image");
                None
            }
        }
    }

    async fn repo_digest(&self, image: &ImageRef) -> Option<String> {
        let inspect = self.client.inspect_image(&image.to_string()).await.ok()?;
        let repository = image.repository();
        inspect.repo_digests?.into_iter().find_map(|d| {
            d.split_once('@')
                .filter(|(repo, _)| *repo == repository)
                .map(|(_, digest)| digest.to_string())
        })
    }
}

#[async_trait]
impl Registry for BollardRegistry {
    async fn authenticate(&self, host: &str) -> Result<RegistryAuth, PublishError> {
        let auth_error = |message: String| PublishError::Auth {
            host: host.to_string(),
            message,
        };
        match &self.credentials {
            Credentials::Ecr(platform) => {
                let region = ecr_region(host).ok_or_else(|| {
                    auth_error("registry host is not an ECR endpoint; configure basic auth".into())
                })?;
                let password = AwsCli::new(platform, region)
                    .ecr_login_password()
                    .await
                    .map_err(|e| auth_error(e.to_string()))?;
                if password.is_empty() {
                    return Err(auth_error("empty login password".into()));
                }
                Ok(RegistryAuth {
                    server: host.to_string(),
                    username: ECR_USERNAME.to_string(),
                    password,
                })
            }
            Credentials::Basic { username, password } => {
                let password = password.resolve().map_err(|e| auth_error(e.to_string()))?;
                Ok(RegistryAuth {
                    server: host.to_string(),
                    username: username.clone(),
                    password,
                })
            }
        }
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuiltImage, PublishError> {
        let options = BuildImageOptions {
            dockerfile: request.dockerfile.clone(),
            t: Some(request.local_tag.clone()),
            buildargs: Some(request.build_args.clone()),
            rm: true,
            ..Default::default()
        };
        let body = Either::Left(Full::new(request.context.clone()));
        let mut stream = self.client.build_image(options, None, Some(body));

        let mut log = Vec::new();
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(chunk) = info.stream {
                        for line in chunk.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
                            tracing::trace!(target: "rollout::build", "{}", line);
                            log.push(line.to_string());
                        }
                    }
                    if let Some(detail) = info.error_detail {
                        let message = detail
                            .message
                            .clone()
                            .unwrap_or_else(|| format!("{:?}", detail));
                        return Err(PublishError::Build {
                            message,
                            output: tail(log),
                        });
                    }
                }
                Err(e) => {
                    return Err(PublishError::Build {
                        message: e.to_string(),
                        output: tail(log),
                    });
                }
            }
        }

        let id = self.local_image_id(&request.local_tag).await;
        Ok(BuiltImage { id, log })
    }

    async fn tag(&self, source: &str, target: &ImageRef) -> Result<(), PublishError> {
        let options = TagImageOptions {
            repo: Some(target.repository()),
            tag: target.tag().map(str::to_string),
        };
        self.client
            .tag_image(source, Some(options))
            .await
            .map_err(|e| PublishError::Tag {
                image: target.to_string(),
                message: e.to_string(),
            })
    }

    async fn push(
        &self,
        image: &ImageRef,
        auth: &RegistryAuth,
    ) -> Result<Option<String>, PublishError> {
        let options = PushImageOptions {
            tag: image.tag().map(str::to_string),
            ..Default::default()
        };
        let credentials = DockerCredentials {
            username: Some(auth.username.clone()),
            password: Some(auth.password.clone()),
            serveraddress: Some(auth.server.clone()),
            ..Default::default()
        };

        let mut stream = self
            .client
            .push_image(&image.repository(), Some(options), Some(credentials));
        let mut digest = None;
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(found) = info.status.as_deref().and_then(push_status_digest) {
                        digest = Some(found);
                    }
                }
                Err(e) => return Err(classify_push_error(image, &auth.server, e.to_string())),
            }
        }

        if digest.is_none() {
            digest = self.repo_digest(image).await;
        }
        Ok(digest)
    }
}

fn tail(mut log: Vec<String>) -> Vec<String> {
    if log.len() > BUILD_LOG_TAIL {
        log.drain(..log.len() - BUILD_LOG_TAIL);
    }
    log
}

/// Region of an ECR host: `<account>.dkr.ecr.<region>.amazonaws.com[.cn]`.
pub(crate) fn ecr_region(host: &str) -> Option<&str> {
    let mut parts = host.split('.');
    let _account = parts.next()?;
    if parts.next()? != "dkr" || parts.next()? != "ecr" {
        return None;
    }
    let region = parts.next()?;
    (parts.next()? == "amazonaws" && !region.is_empty()).then_some(region)
}

/// Digest from a push status line such as `<tag>: digest: sha256:... size: 1234`.
pub(crate) fn push_status_digest(status: &str) -> Option<String> {
    let (_, rest) = status.split_once("digest: ")?;
    let digest = rest.split_whitespace().next()?;
    digest.starts_with("sha256:").then(|| digest.to_string())
}

/// Push failures caused by credentials surface as auth errors.
fn classify_push_error(image: &ImageRef, host: &str, message: String) -> PublishError {
    let lower = message.to_ascii_lowercase();
    let auth = ["unauthorized", "authentication required", "no basic auth credentials", "denied"]
        .iter()
        .any(|needle| lower.contains(needle));
    if auth {
        PublishError::Auth {
            host: host.to_string(),
            message,
        }
    } else {
        PublishError::Push {
            image: image.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecr_region_parses_standard_hosts() {
        assert_eq!(
            ecr_region("123456789012.dkr.ecr.ap-northeast-1.amazonaws.com"),
            Some("ap-northeast-1")
        );
        assert_eq!(
            ecr_region("123456789012.dkr.ecr.cn-north-1.amazonaws.com.cn"),
            Some("cn-north-1")
        );
        assert_eq!(ecr_region("ghcr.io"), None);
        assert_eq!(ecr_region("registry.example.com"), None);
    }

    #[test]
    fn push_status_digest_extracts_sha() {
        assert_eq!(
            push_status_digest("20250101120000-abc: digest: sha256:deadbeef size: 1573"),
            Some("sha256:deadbeef".to_string())
        );
        assert_eq!(push_status_digest("Pushed"), None);
        assert_eq!(push_status_digest("Layer already exists"), None);
    }

    #[test]
    fn push_errors_with_credential_messages_are_auth() {
        let image = ImageRef::parse("1.dkr.ecr.us-east-1.amazonaws.com/agent:t").unwrap();
        let err = classify_push_error(&image, "h", "unauthorized: token expired".into());
        assert!(matches!(err, PublishError::Auth { .. }));
        let err = classify_push_error(&image, "h", "connection reset by peer".into());
        assert!(matches!(err, PublishError::Push { .. }));
    }

    #[test]
    fn build_log_tail_keeps_last_lines() {
        let log: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let kept = tail(log);
        assert_eq!(kept.len(), BUILD_LOG_TAIL);
        assert_eq!(kept.last().map(String::as_str), Some("99"));
    }
}
