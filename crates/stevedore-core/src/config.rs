use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::DeploymentContext;
use crate::model::ServiceConfig;
use crate::normalize::normalize;

/// File name of the descriptor, looked up in the project directory.
pub const CONFIG_FILE: &str = "stevedore.toml";

/// stevedore.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StevedoreConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub deployment: DeploymentDescriptor,
}

/// Host metadata shared by every container of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Service name, used as the prefix of every derived resource name
    pub name: Option<String>,
    /// Deployment stage (defaults to dev)
    #[serde(default = "default_stage")]
    pub stage: String,
    /// AWS region (defaults to us-east-1)
    #[serde(default = "default_region")]
    pub region: String,
    /// Provider-wide environment, inherited by every container
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// Raw `[deployment]` section, before normalization.
///
/// Every field the normalizer defaults is optional here so that "absent"
/// and "explicitly set" stay distinguishable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    /// ECS cluster name or ARN
    pub cluster: Option<String>,
    #[serde(default)]
    pub vpc: VpcDescriptor,
    /// Task CPU units, shared by all containers
    pub cpu: Option<u32>,
    /// Task memory in MB
    pub memory: Option<u32>,
    /// Desired task count
    pub scale: Option<u32>,
    #[serde(default)]
    pub ecr: RegistryDescriptor,
    pub hosted_zone: Option<HostedZoneDescriptor>,
    pub load_balancer: Option<LoadBalancerDescriptor>,
    /// IAM actions granted to the application task role
    pub task_permissions: Option<Vec<String>>,
    #[serde(default)]
    pub containers: Vec<ContainerDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpcDescriptor {
    pub id: Option<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub assign_public_ip: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDescriptor {
    pub account_id: Option<String>,
    /// Optional prefix prepended to every repository name
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedZoneDescriptor {
    /// Zone name, e.g. `example.com.`
    pub name: String,
    /// ACM certificate for the API custom domain
    pub certificate_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerDescriptor {
    /// Public DNS name of the shared load balancer
    pub dns: String,
    pub listener_arn: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    #[serde(default)]
    pub name: String,
    /// External path prefix; absent means the container gets no ingress
    pub path: Option<String>,
    pub port: Option<u16>,
    /// Docker build context, relative to the project directory
    pub context: Option<String>,
    /// Dockerfile location (defaults to `<context>/Dockerfile`)
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub health_check: HealthCheckDescriptor,
    #[serde(default)]
    pub secrets: Vec<SecretDescriptor>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Image tag pinned for this container instead of the run tag
    pub tag: Option<String>,
    /// Listener rule priority (defaults to the 1-based position in the list)
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckDescriptor {
    pub path: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub codes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretDescriptor {
    /// Environment variable name exposed to the container
    pub name: String,
    /// Backing store: `ssm`, `kms` or `secretsmanager`
    #[serde(rename = "type")]
    pub store: String,
    /// Parameter name, key id, or secret name within the store
    pub id: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: None,
            stage: default_stage(),
            region: default_region(),
            environment: BTreeMap::new(),
        }
    }
}

impl StevedoreConfig {
    /// Load `stevedore.toml` from the given project directory.
    ///
    /// Unlike most tools there is no useful default descriptor, so a missing
    /// file is an error rather than an empty config.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(crate::Error::ConfigMissing {
                dir: project_dir.to_path_buf(),
            });
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.clone(),
            source: e,
        })?;

        tracing::debug!(
            path = %config_path.display(),
            containers = config.deployment.containers.len(),
            "loaded descriptor"
        );
        Ok(config)
    }

    /// Normalize the descriptor and build the host context in one step.
    pub fn resolve(
        &self,
        stage: Option<&str>,
        region: Option<&str>,
    ) -> crate::Result<(ServiceConfig, DeploymentContext)> {
        let context = DeploymentContext::from_section(&self.service, stage, region)?;
        let config = normalize(&self.deployment)?;
        Ok((config, context))
    }
}

fn default_stage() -> String {
    "dev".to_owned()
}

fn default_region() -> String {
    "us-east-1".to_owned()
}
