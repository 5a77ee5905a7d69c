use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::aws::AwsError;
use crate::executor::{AwsExecutor, RealExecutor};

const REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";

/// AWS operations client, parameterized over the executor for testability.
pub struct AwsClient<E: AwsExecutor = RealExecutor> {
    executor: E,
}

impl AwsClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for AwsClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: AwsExecutor> AwsClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── ECR ──

    pub async fn describe_repository(
        &self,
        account_id: &str,
        name: &str,
        region: &str,
    ) -> Result<Repository, RegistryError> {
        let output = self
            .executor
            .exec(&args([
                "ecr",
                "describe-repositories",
                "--registry-id",
                account_id,
                "--repository-names",
                name,
                "--region",
                region,
                "--output",
                "json",
            ]))
            .await
            .map_err(|e| {
                if e.is_error_code(REPOSITORY_NOT_FOUND) {
                    RegistryError::NotFound {
                        repository: name.to_owned(),
                    }
                } else {
                    RegistryError::Describe {
                        repository: name.to_owned(),
                        source: e,
                    }
                }
            })?;

        let parsed: DescribeRepositories =
            serde_json::from_str(&output).map_err(|e| RegistryError::Parse { source: e })?;
        parsed
            .repositories
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound {
                repository: name.to_owned(),
            })
    }

    pub async fn create_repository(
        &self,
        name: &str,
        region: &str,
    ) -> Result<Repository, RegistryError> {
        let output = self
            .executor
            .exec(&args([
                "ecr",
                "create-repository",
                "--repository-name",
                name,
                "--region",
                region,
                "--output",
                "json",
            ]))
            .await
            .map_err(|e| RegistryError::Create {
                repository: name.to_owned(),
                source: e,
            })?;

        let parsed: CreateRepository =
            serde_json::from_str(&output).map_err(|e| RegistryError::Parse { source: e })?;
        Ok(parsed.repository)
    }

    /// Delete a repository; `force` also deletes the images in it.
    pub async fn delete_repository(
        &self,
        name: &str,
        region: &str,
        force: bool,
    ) -> Result<(), RegistryError> {
        let mut cmd = args([
            "ecr",
            "delete-repository",
            "--repository-name",
            name,
            "--region",
            region,
            "--output",
            "json",
        ]);
        if force {
            cmd.push("--force".to_owned());
        }

        self.executor.exec(&cmd).await.map_err(|e| {
            if e.is_error_code(REPOSITORY_NOT_FOUND) {
                RegistryError::NotFound {
                    repository: name.to_owned(),
                }
            } else {
                RegistryError::Delete {
                    repository: name.to_owned(),
                    source: e,
                }
            }
        })?;

        tracing::info!(repository = name, "deleted repository");
        Ok(())
    }

    /// Return the repository, creating it when it does not exist yet.
    pub async fn ensure_repository(
        &self,
        account_id: &str,
        name: &str,
        region: &str,
    ) -> Result<Repository, RegistryError> {
        match self.describe_repository(account_id, name, region).await {
            Ok(repository) => {
                tracing::info!(repository = name, "repository already exists");
                Ok(repository)
            }
            Err(RegistryError::NotFound { .. }) => {
                let repository = self.create_repository(name, region).await?;
                tracing::info!(
                    repository = %repository.repository_name,
                    arn = %repository.repository_arn,
                    "created repository"
                );
                Ok(repository)
            }
            Err(e) => Err(e),
        }
    }

    /// Registry password for `docker login --username AWS`.
    pub async fn login_password(&self, region: &str) -> Result<String, CredentialError> {
        let output = self
            .executor
            .exec(&args(["ecr", "get-login-password", "--region", region]))
            .await
            .map_err(|e| CredentialError::LoginPassword {
                region: region.to_owned(),
                source: e,
            })?;

        let password = output.trim();
        if password.is_empty() {
            return Err(CredentialError::EmptyPassword {
                region: region.to_owned(),
            });
        }
        Ok(password.to_owned())
    }

    // ── ECS ──

    pub async fn describe_service_deployments(
        &self,
        cluster: &str,
        service: &str,
        region: &str,
    ) -> Result<Vec<Deployment>, DeploymentError> {
        let output = self
            .executor
            .exec(&args([
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                service,
                "--region",
                region,
                "--output",
                "json",
            ]))
            .await
            .map_err(|e| DeploymentError::Describe {
                service: service.to_owned(),
                source: e,
            })?;

        let parsed: DescribeServices =
            serde_json::from_str(&output).map_err(|e| DeploymentError::Parse { source: e })?;
        let found = parsed
            .services
            .into_iter()
            .find(|s| s.service_name == service)
            .ok_or_else(|| DeploymentError::ServiceNotFound {
                service: service.to_owned(),
            })?;

        found
            .deployments
            .into_iter()
            .map(RawDeployment::parse)
            .collect()
    }

    /// Start a new deployment of the service with its current task definition.
    pub async fn force_new_deployment(
        &self,
        cluster: &str,
        service: &str,
        region: &str,
    ) -> Result<(), DeploymentError> {
        self.executor
            .exec(&args([
                "ecs",
                "update-service",
                "--cluster",
                cluster,
                "--service",
                service,
                "--force-new-deployment",
                "--region",
                region,
                "--output",
                "json",
            ]))
            .await
            .map_err(|e| DeploymentError::Update {
                service: service.to_owned(),
                source: e,
            })?;

        tracing::info!(cluster, service, "forced new deployment");
        Ok(())
    }
}

// ── Response shapes ──

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub repository_name: String,
    pub repository_uri: String,
    pub repository_arn: String,
}

/// One entry of an ECS service's deployment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// `PRIMARY`, `ACTIVE`, or `INACTIVE`
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    pub fn is_primary(&self) -> bool {
        self.status == "PRIMARY"
    }
}

#[derive(Deserialize)]
struct DescribeRepositories {
    #[serde(default)]
    repositories: Vec<Repository>,
}

#[derive(Deserialize)]
struct CreateRepository {
    repository: Repository,
}

#[derive(Deserialize)]
struct DescribeServices {
    #[serde(default)]
    services: Vec<RawService>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    service_name: String,
    #[serde(default)]
    deployments: Vec<RawDeployment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeployment {
    status: String,
    created_at: Value,
    updated_at: Value,
}

impl RawDeployment {
    fn parse(self) -> Result<Deployment, DeploymentError> {
        Ok(Deployment {
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            status: self.status,
        })
    }
}

/// CLI v2 prints ISO 8601 strings; v1 prints epoch seconds.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DeploymentError> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DeploymentError::InvalidTimestamp {
                value: s.clone(),
                source: e,
            }),
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0).round() as i64))
            .ok_or_else(|| DeploymentError::UnsupportedTimestamp {
                value: n.to_string(),
            }),
        other => Err(DeploymentError::UnsupportedTimestamp {
            value: other.to_string(),
        }),
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("repository '{repository}' does not exist")]
    NotFound { repository: String },

    #[error("failed to describe repository '{repository}'")]
    Describe {
        repository: String,
        source: AwsError,
    },

    #[error("failed to create repository '{repository}'")]
    Create {
        repository: String,
        source: AwsError,
    },

    #[error("failed to delete repository '{repository}'")]
    Delete {
        repository: String,
        source: AwsError,
    },

    #[error("unexpected ECR response")]
    Parse { source: serde_json::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to get registry login password for {region}")]
    LoginPassword { region: String, source: AwsError },

    #[error("registry login password for {region} was empty")]
    EmptyPassword { region: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("failed to describe service '{service}'")]
    Describe { service: String, source: AwsError },

    #[error("service '{service}' was not found in the cluster")]
    ServiceNotFound { service: String },

    #[error("unexpected ECS response")]
    Parse { source: serde_json::Error },

    #[error("invalid deployment timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("unsupported deployment timestamp {value}")]
    UnsupportedTimestamp { value: String },

    #[error("failed to update service '{service}'")]
    Update { service: String, source: AwsError },
}
