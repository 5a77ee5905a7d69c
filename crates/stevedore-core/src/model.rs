//! Canonical service model produced by [`normalize`](crate::normalize).
//!
//! Values here are fully defaulted and validated. Synthesis and the
//! build/push pipeline only ever see these types, never the raw descriptor.

use std::collections::BTreeMap;

/// Normalized deployment configuration for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub cluster: String,
    pub network: NetworkPlacement,
    /// Desired task count
    pub scale: u32,
    /// Task CPU units, divided across containers
    pub cpu: u32,
    /// Task memory in MB
    pub memory: u32,
    pub registry: Registry,
    pub hosted_zone: Option<HostedZone>,
    pub load_balancer: Option<LoadBalancer>,
    /// IAM actions granted to the application task role
    pub task_permissions: Vec<String>,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlacement {
    pub vpc_id: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub account_id: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub name: String,
    pub certificate_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub dns: String,
    pub listener_arn: String,
}

/// A single container of the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Unique within the service; every per-container logical name derives from it
    pub name: String,
    pub role: ContainerRole,
    pub port: u16,
    pub context: String,
    pub dockerfile: String,
    pub health_check: HealthCheck,
    pub secrets: Vec<SecretRef>,
    pub environment: BTreeMap<String, String>,
    pub tag: Option<String>,
    pub priority: Option<u32>,
}

/// Whether a container receives external traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRole {
    /// No target group, listener rule, or API resources
    Internal,
    /// Reachable under `path` through the load balancer and the API
    Routable { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub path: String,
    pub port: u16,
    pub protocol: String,
    pub codes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
    pub store: SecretStore,
    pub id: String,
}

/// Where a secret value lives.
///
/// Unknown store names are kept as [`SecretStore::Unsupported`] so that
/// synthesis can skip them without failing the whole deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStore {
    ParameterStore,
    KeyManagement,
    SecretsManager,
    Unsupported(String),
}

impl SecretStore {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ssm" => Self::ParameterStore,
            "kms" => Self::KeyManagement,
            "secretsmanager" => Self::SecretsManager,
            _ => Self::Unsupported(raw.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ParameterStore => "ssm",
            Self::KeyManagement => "kms",
            Self::SecretsManager => "secretsmanager",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl ContainerSpec {
    pub fn route_path(&self) -> Option<&str> {
        match &self.role {
            ContainerRole::Internal => None,
            ContainerRole::Routable { path } => Some(path),
        }
    }

    pub fn is_routable(&self) -> bool {
        matches!(self.role, ContainerRole::Routable { .. })
    }

    /// Tag to publish this container's image under.
    pub fn effective_tag<'a>(&'a self, run_tag: &'a str) -> &'a str {
        self.tag.as_deref().unwrap_or(run_tag)
    }
}

impl ServiceConfig {
    pub fn routable_containers(&self) -> impl Iterator<Item = &ContainerSpec> {
        self.containers.iter().filter(|c| c.is_routable())
    }

    pub fn has_ingress(&self) -> bool {
        self.containers.iter().any(ContainerSpec::is_routable)
    }

    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// CPU units allotted to each container: `floor(cpu / containers)`.
    ///
    /// The remainder is left unassigned at the container level; the task
    /// still reserves the full amount.
    pub fn container_cpu(&self) -> u32 {
        match self.containers.len() {
            0 => self.cpu,
            // The quotient never exceeds `cpu`, so it fits back into u32
            count => (u64::from(self.cpu) / count as u64) as u32,
        }
    }

    /// ECR repository name for a container, `[namespace/]name` lower-cased.
    pub fn repository_name(&self, container: &ContainerSpec) -> String {
        match &self.registry.namespace {
            Some(ns) => format!("{ns}/{}", container.name).to_lowercase(),
            None => container.name.to_lowercase(),
        }
    }

    /// Registry host for the configured account in `region`.
    pub fn registry_host(&self, region: &str) -> String {
        format!(
            "{account}.dkr.ecr.{region}.amazonaws.com",
            account = self.registry.account_id
        )
    }

    /// Fully-qualified image reference `{host}/{repository}:{tag}`.
    pub fn image_uri(&self, container: &ContainerSpec, region: &str, run_tag: &str) -> String {
        format!(
            "{host}/{repo}:{tag}",
            host = self.registry_host(region),
            repo = self.repository_name(container),
            tag = container.effective_tag(run_tag),
        )
    }
}

impl HostedZone {
    /// Zone name without the trailing root dot.
    pub fn domain(&self) -> &str {
        self.name.strip_suffix('.').unwrap_or(&self.name)
    }
}
