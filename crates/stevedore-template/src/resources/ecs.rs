use std::collections::BTreeMap;

use serde_json::{Value, json};
use stevedore_core::{ContainerSpec, DeploymentContext};

use super::names;
use crate::fragment::{Fragment, reference};
use crate::synth::{Route, Synthesizer, collapse_slashes};

/// Variable carrying the container's external path prefix.
pub const BASE_PATH_VAR: &str = "BASE_PATH";

impl Synthesizer<'_> {
    /// Fargate task definition holding every container of the service.
    pub fn task_definition(&self, tag: &str) -> Fragment {
        let cpu = self.config.container_cpu();
        let log_group = self.ctx.log_group_name();

        let definitions: Vec<Value> = self
            .config
            .containers
            .iter()
            .enumerate()
            .map(|(index, container)| {
                let secrets: Vec<Value> = self
                    .container_secrets(index)
                    .iter()
                    .map(|s| json!({ "Name": s.name, "ValueFrom": s.arn }))
                    .collect();
                let port_mappings = if container.port == 0 {
                    json!([])
                } else {
                    json!([{ "ContainerPort": container.port }])
                };

                json!({
                    "Essential": true,
                    "Image": self.config.image_uri(container, &self.ctx.region, tag),
                    "Name": container.name,
                    "Cpu": cpu,
                    "Environment": container_environment(self.ctx, container),
                    "Secrets": secrets,
                    "PortMappings": port_mappings,
                    "ReadonlyRootFilesystem": true,
                    "LogConfiguration": {
                        "LogDriver": "awslogs",
                        "Options": {
                            "awslogs-group": log_group,
                            "awslogs-region": self.ctx.region,
                            "awslogs-stream-prefix": container.name,
                        },
                    },
                })
            })
            .collect();

        Fragment::new(
            names::TASK_DEFINITION,
            "AWS::ECS::TaskDefinition",
            json!({
                "ExecutionRoleArn": reference(names::EXECUTION_ROLE),
                "TaskRoleArn": reference(names::TASK_ROLE),
                "Cpu": self.config.cpu,
                "Memory": self.config.memory,
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "ContainerDefinitions": definitions,
                "Family": log_group,
            }),
        )
    }

    /// The ECS service, attached to the target group of every routable container.
    pub fn service(&self, tag: &str) -> Fragment {
        let routes: Vec<Route<'_>> = self.routes().collect();
        let load_balancers: Vec<Value> = routes
            .iter()
            .map(|route| {
                json!({
                    "ContainerName": route.name(),
                    "ContainerPort": route.container.port,
                    "TargetGroupArn": reference(&route.target_group_name()),
                })
            })
            .collect();
        let network = &self.config.network;
        let assign_public_ip = if network.assign_public_ip {
            "ENABLED"
        } else {
            "DISABLED"
        };

        Fragment::new(
            names::SERVICE,
            "AWS::ECS::Service",
            json!({
                "Cluster": self.config.cluster,
                "LaunchType": "FARGATE",
                "DeploymentConfiguration": {
                    "MaximumPercent": 200,
                    "MinimumHealthyPercent": 50,
                },
                "DesiredCount": self.config.scale,
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": assign_public_ip,
                        "SecurityGroups": network.security_groups,
                        "Subnets": network.subnets,
                    },
                },
                "SchedulingStrategy": "REPLICA",
                "ServiceName": self.ctx.service_identifier(tag),
                "TaskDefinition": reference(names::TASK_DEFINITION),
                "LoadBalancers": load_balancers,
            }),
        )
        .depends_on(routes.iter().map(Route::target_group_name))
    }
}

/// Effective environment of a container as `(name, value)` pairs.
///
/// Provider-wide values are overridden by the container's own; `BASE_PATH`
/// comes last and always reflects the container path.
pub fn effective_environment(
    ctx: &DeploymentContext,
    container: &ContainerSpec,
) -> Vec<(String, String)> {
    let mut merged: BTreeMap<&str, &str> = ctx
        .environment
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (key, value) in &container.environment {
        merged.insert(key.as_str(), value.as_str());
    }
    merged.remove(BASE_PATH_VAR);

    let base_path = collapse_slashes(&format!("/{}", container.route_path().unwrap_or("")));

    merged
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .chain(std::iter::once((BASE_PATH_VAR.to_owned(), base_path)))
        .collect()
}

/// [`effective_environment`] in task definition shape, `[{Name, Value}]`.
pub fn container_environment(ctx: &DeploymentContext, container: &ContainerSpec) -> Vec<Value> {
    effective_environment(ctx, container)
        .into_iter()
        .map(|(name, value)| json!({ "Name": name, "Value": value }))
        .collect()
}
