use std::collections::BTreeMap;

use crate::config::ServiceSection;
use crate::error::ValidationError;
use crate::model::HostedZone;

/// Read-only host metadata for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    pub service_name: String,
    pub stage: String,
    pub region: String,
    /// Provider-wide environment, overridable per container
    pub environment: BTreeMap<String, String>,
}

impl DeploymentContext {
    /// Build the context from `[service]`, letting command-line values win.
    pub fn from_section(
        section: &ServiceSection,
        stage: Option<&str>,
        region: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let service_name = section
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingField("service.name"))?;

        Ok(Self {
            service_name: service_name.to_owned(),
            stage: stage.unwrap_or(&section.stage).to_owned(),
            region: region.unwrap_or(&section.region).to_owned(),
            environment: section.environment.clone(),
        })
    }

    /// Name of the deployed ECS service: `{service}-{stage}-{tag}`.
    pub fn service_identifier(&self, tag: &str) -> String {
        format!("{}-{}-{tag}", self.service_name, self.stage)
    }

    /// Shared name of the log group and the task definition family.
    pub fn log_group_name(&self) -> String {
        format!("{}-ecs-service-{}", self.service_name, self.stage)
    }

    /// Public API hostname, e.g. `orders.example.com`.
    pub fn api_domain(&self, zone: &HostedZone) -> String {
        format!("{}.{}", self.service_name, zone.domain())
    }

    /// Load balancer hostname, e.g. `orders-lb.example.com`.
    pub fn lb_domain(&self, zone: &HostedZone) -> String {
        format!("{}-lb.{}", self.service_name, zone.domain())
    }
}
