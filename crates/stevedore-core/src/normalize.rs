//! Descriptor validation and defaulting.

use std::collections::HashMap;

use crate::config::{
    ContainerDescriptor, DeploymentDescriptor, HealthCheckDescriptor, SecretDescriptor,
};
use crate::error::ValidationError;
use crate::model::{
    ContainerRole, ContainerSpec, HealthCheck, HostedZone, LoadBalancer, NetworkPlacement,
    Registry, SecretRef, SecretStore, ServiceConfig,
};

pub const DEFAULT_CPU: u32 = 1024;
pub const DEFAULT_MEMORY: u32 = 2048;
pub const DEFAULT_SCALE: u32 = 1;
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";
pub const DEFAULT_HEALTH_CHECK_PORT: u16 = 80;
pub const DEFAULT_HEALTH_CHECK_PROTOCOL: &str = "HTTP";
pub const DEFAULT_HEALTH_CHECK_CODES: &str = "200-299";
pub const DEFAULT_BUILD_CONTEXT: &str = "./";

/// Validate a raw `[deployment]` section and fill in defaults.
///
/// Explicit values always win over defaults. The result is immutable for
/// the rest of the run.
pub fn normalize(raw: &DeploymentDescriptor) -> Result<ServiceConfig, ValidationError> {
    let cluster = required(raw.cluster.as_deref(), "cluster")?;
    let vpc_id = required(raw.vpc.id.as_deref(), "vpc.id")?;
    let account_id = required(raw.ecr.account_id.as_deref(), "ecr.account_id")?;

    let cpu = positive(raw.cpu, DEFAULT_CPU, "cpu")?;
    let memory = positive(raw.memory, DEFAULT_MEMORY, "memory")?;
    let scale = positive(raw.scale, DEFAULT_SCALE, "scale")?;

    if raw.containers.is_empty() {
        return Err(ValidationError::NoContainers);
    }

    // Repository names are lower-cased, so `Api` and `api` would publish
    // to the same image.
    let mut repositories: HashMap<String, &str> = HashMap::new();
    let mut routes: HashMap<&str, &str> = HashMap::new();
    let mut containers = Vec::with_capacity(raw.containers.len());
    for (index, descriptor) in raw.containers.iter().enumerate() {
        let container = normalize_container(index, descriptor)?;
        let name = descriptor.name.trim();

        let repository = container.name.to_lowercase();
        if let Some(first) = repositories.insert(repository.clone(), name) {
            if first == name {
                return Err(ValidationError::DuplicateContainerName {
                    name: container.name,
                });
            }
            return Err(ValidationError::DuplicateRepositoryName {
                repository,
                first: first.to_owned(),
                second: container.name,
            });
        }

        let route = descriptor
            .path
            .as_deref()
            .filter(|_| container.is_routable())
            .map(route_key);
        if let Some(path) = route {
            if let Some(first) = routes.insert(path, name) {
                return Err(ValidationError::DuplicateRoute {
                    path: format!("/{path}"),
                    first: first.to_owned(),
                    second: container.name,
                });
            }
        }
        containers.push(container);
    }

    let hosted_zone = raw.hosted_zone.as_ref().map(|hz| HostedZone {
        name: hz.name.clone(),
        certificate_arn: hz.certificate_arn.clone(),
    });
    let load_balancer = raw.load_balancer.as_ref().map(|lb| LoadBalancer {
        dns: lb.dns.clone(),
        listener_arn: lb.listener_arn.clone(),
    });

    // Ingress resources reference the zone and the listener; refuse to
    // produce half-wired routing.
    if let Some(routable) = containers.iter().find(|c| c.is_routable()) {
        if hosted_zone.is_none() {
            return Err(ValidationError::IngressWithoutHostedZone {
                container: routable.name.clone(),
            });
        }
        if load_balancer.is_none() {
            return Err(ValidationError::IngressWithoutListener {
                container: routable.name.clone(),
            });
        }
    }

    let config = ServiceConfig {
        cluster,
        network: NetworkPlacement {
            vpc_id,
            subnets: raw.vpc.subnets.clone(),
            security_groups: raw.vpc.security_groups.clone(),
            assign_public_ip: raw.vpc.assign_public_ip.unwrap_or(true),
        },
        scale,
        cpu,
        memory,
        registry: Registry {
            account_id,
            namespace: raw
                .ecr
                .namespace
                .as_deref()
                .map(|ns| ns.trim_matches('/'))
                .filter(|ns| !ns.is_empty())
                .map(str::to_owned),
        },
        hosted_zone,
        load_balancer,
        task_permissions: raw
            .task_permissions
            .clone()
            .unwrap_or_else(|| vec!["sns:Publish".to_owned()]),
        containers,
    };

    tracing::debug!(
        cluster = %config.cluster,
        containers = config.containers.len(),
        routable = config.routable_containers().count(),
        "descriptor normalized"
    );
    Ok(config)
}

fn normalize_container(
    index: usize,
    raw: &ContainerDescriptor,
) -> Result<ContainerSpec, ValidationError> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyContainerName { index });
    }
    // Names prefix CloudFormation logical ids.
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidContainerName {
            name: name.to_owned(),
        });
    }

    let port = raw.port.unwrap_or(DEFAULT_PORT);
    let role = match raw.path.as_deref().map(str::trim) {
        None | Some("") => ContainerRole::Internal,
        Some(path) => {
            if port == 0 {
                return Err(ValidationError::PathWithoutPort {
                    container: name.to_owned(),
                    path: path.to_owned(),
                });
            }
            if route_key(path).contains('/') {
                return Err(ValidationError::NestedRoutePath {
                    container: name.to_owned(),
                    path: path.to_owned(),
                });
            }
            ContainerRole::Routable {
                path: path.to_owned(),
            }
        }
    };

    let context = raw
        .context
        .clone()
        .unwrap_or_else(|| DEFAULT_BUILD_CONTEXT.to_owned());
    let dockerfile = raw
        .dockerfile
        .clone()
        .unwrap_or_else(|| format!("{}/Dockerfile", context.trim_end_matches('/')));

    Ok(ContainerSpec {
        name: name.to_owned(),
        role,
        port,
        context,
        dockerfile,
        health_check: normalize_health_check(&raw.health_check),
        secrets: raw.secrets.iter().map(normalize_secret).collect(),
        environment: raw.environment.clone(),
        tag: raw.tag.clone(),
        priority: raw.priority,
    })
}

/// Path without surrounding separators; `` for the root.
fn route_key(path: &str) -> &str {
    path.trim().trim_matches('/')
}

fn normalize_health_check(raw: &HealthCheckDescriptor) -> HealthCheck {
    HealthCheck {
        path: raw
            .path
            .clone()
            .unwrap_or_else(|| DEFAULT_HEALTH_CHECK_PATH.to_owned()),
        port: raw.port.unwrap_or(DEFAULT_HEALTH_CHECK_PORT),
        protocol: raw
            .protocol
            .clone()
            .unwrap_or_else(|| DEFAULT_HEALTH_CHECK_PROTOCOL.to_owned()),
        codes: raw
            .codes
            .clone()
            .unwrap_or_else(|| DEFAULT_HEALTH_CHECK_CODES.to_owned()),
    }
}

fn normalize_secret(raw: &SecretDescriptor) -> SecretRef {
    SecretRef {
        name: raw.name.clone(),
        store: SecretStore::parse(&raw.store),
        id: raw.id.clone(),
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ValidationError::MissingField(field))
}

fn positive(value: Option<u32>, default: u32, field: &'static str) -> Result<u32, ValidationError> {
    match value {
        Some(0) => Err(ValidationError::ZeroValue(field)),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}
