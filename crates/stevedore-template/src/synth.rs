//! The resource synthesizer.
//!
//! [`Synthesizer`] exposes one pure method per resource kind, each
//! returning a [`Fragment`]. Ingress-only kinds live on [`Ingress`], which
//! exists only when at least one container is routable, and per-route kinds
//! take a [`Route`], which exists only for routable containers. Calling an
//! ingress builder for an internal container is therefore not expressible.
//!
//! [`Synthesizer::synthesize`] runs the whole pass in generation order:
//!
//! ```text
//! shared      LogGroup, roles, TaskDefinition, ECSService
//! ingress     CName, RestAPI, CustomDomain, ApiDnsEntry
//! per route   TargetGroup, ListenerRule, PathResource, methods, ProxyResource
//! aggregate   Stage<id> (after all methods), BasePathMapping, outputs
//! ```

use serde_json::json;
use stevedore_core::{ContainerSpec, DeploymentContext, HostedZone, LoadBalancer, ServiceConfig};

use crate::fragment::{Output, get_att};
use crate::graph::{GraphError, InfrastructureGraph};
use crate::resources::names;
use crate::secrets::{ResolvedSecret, UnsupportedSecretType, resolve_container_secrets};

/// Caller-supplied values that vary between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Image tag of this run
    pub tag: String,
    /// Suffix of the API deployment's logical name (`Stage<id>`)
    pub deployment_id: String,
}

/// Result of a full synthesis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub graph: InfrastructureGraph,
    /// Secrets left out because their store is not supported
    pub skipped_secrets: Vec<UnsupportedSecretType>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("container '{container}' is routable but the service has no {missing} configured")]
    IngressNotConfigured {
        container: String,
        missing: &'static str,
    },

    #[error("deployment id '{0}' must be non-empty ASCII letters and digits")]
    InvalidDeploymentId(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Derives CloudFormation fragments from a normalized service.
#[derive(Debug)]
pub struct Synthesizer<'a> {
    pub(crate) config: &'a ServiceConfig,
    pub(crate) ctx: &'a DeploymentContext,
    ingress: Option<(&'a HostedZone, &'a LoadBalancer)>,
    /// Resolved secrets per container, parallel to `config.containers`
    secrets: Vec<Vec<ResolvedSecret>>,
    skipped: Vec<UnsupportedSecretType>,
}

/// Builders for resources that only exist when the service has ingress.
#[derive(Debug, Clone, Copy)]
pub struct Ingress<'a> {
    pub(crate) synth: &'a Synthesizer<'a>,
    pub(crate) zone: &'a HostedZone,
    pub(crate) lb: &'a LoadBalancer,
}

/// A routable container together with its position in the service.
#[derive(Debug, Clone, Copy)]
pub struct Route<'a> {
    pub container: &'a ContainerSpec,
    pub path: &'a str,
    pub index: usize,
}

impl<'a> Synthesizer<'a> {
    /// Prepare synthesis for one service.
    ///
    /// Secrets are resolved once here; unsupported ones are logged and
    /// reported through [`skipped_secrets`](Self::skipped_secrets).
    pub fn new(
        config: &'a ServiceConfig,
        ctx: &'a DeploymentContext,
    ) -> Result<Self, SynthesisError> {
        let ingress = match config.routable_containers().next() {
            None => None,
            Some(routable) => {
                let zone = config.hosted_zone.as_ref().ok_or_else(|| {
                    SynthesisError::IngressNotConfigured {
                        container: routable.name.clone(),
                        missing: "hosted zone",
                    }
                })?;
                let lb = config.load_balancer.as_ref().ok_or_else(|| {
                    SynthesisError::IngressNotConfigured {
                        container: routable.name.clone(),
                        missing: "load balancer listener",
                    }
                })?;
                Some((zone, lb))
            }
        };

        let mut secrets = Vec::with_capacity(config.containers.len());
        let mut skipped = Vec::new();
        for container in &config.containers {
            let (resolved, unsupported) =
                resolve_container_secrets(container, &ctx.region, &config.registry.account_id);
            secrets.push(resolved);
            skipped.extend(unsupported);
        }

        Ok(Self {
            config,
            ctx,
            ingress,
            secrets,
            skipped,
        })
    }

    pub fn skipped_secrets(&self) -> &[UnsupportedSecretType] {
        &self.skipped
    }

    /// Resolved secrets of the container at `index` in the service.
    pub(crate) fn container_secrets(&self, index: usize) -> &[ResolvedSecret] {
        self.secrets.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn all_secrets(&self) -> impl Iterator<Item = &ResolvedSecret> {
        self.secrets.iter().flatten()
    }

    /// Ingress builders, or `None` when no container is routable.
    pub fn ingress(&self) -> Option<Ingress<'_>> {
        self.ingress.map(|(zone, lb)| Ingress {
            synth: self,
            zone,
            lb,
        })
    }

    /// Routable containers in config order.
    pub fn routes(&self) -> impl Iterator<Item = Route<'a>> + use<'a> {
        let config = self.config;
        config
            .containers
            .iter()
            .enumerate()
            .filter_map(|(index, container)| Route::new(container, index))
    }

    /// Run the full pass into a fresh graph.
    pub fn synthesize(&self, options: &SynthesisOptions) -> Result<Synthesis, SynthesisError> {
        let id = options.deployment_id.as_str();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SynthesisError::InvalidDeploymentId(id.to_owned()));
        }

        let tag = options.tag.as_str();
        let mut graph = InfrastructureGraph::new();

        graph.merge(self.log_group())?;
        graph.merge(self.execution_role())?;
        graph.merge(self.task_role())?;
        graph.merge(self.task_definition(tag))?;
        graph.merge(self.service(tag))?;

        graph.merge_output(
            "ECSServiceName",
            Output {
                description: Some(format!("ECS service for {}", self.ctx.service_name)),
                value: get_att(names::SERVICE, "Name"),
            },
        )?;

        if let Some(ingress) = self.ingress() {
            graph.merge(ingress.lb_cname())?;
            graph.merge(ingress.rest_api())?;
            graph.merge(ingress.custom_domain())?;
            graph.merge(ingress.api_alias())?;

            for route in self.routes() {
                graph.merge(ingress.target_group(&route))?;
                graph.merge(ingress.listener_rule(&route))?;
                if !route.is_root() {
                    graph.merge(ingress.path_resource(&route))?;
                }
                graph.merge(ingress.path_method(&route))?;
                graph.merge(ingress.proxy_resource(&route))?;
                graph.merge(ingress.proxy_method(&route))?;
            }

            let deployment = ingress.deployment(&options.deployment_id, graph.api_methods());
            let deployment_name = deployment.logical_name.clone();
            graph.merge(deployment)?;
            graph.merge(ingress.base_path_mapping(&deployment_name))?;

            graph.merge_output(
                "ServiceEndpoint",
                Output {
                    description: Some("Public API endpoint".to_owned()),
                    value: json!(format!("https://{}", self.ctx.api_domain(ingress.zone))),
                },
            )?;
        }

        tracing::info!(
            service = %self.ctx.service_name,
            stage = %self.ctx.stage,
            resources = graph.len(),
            skipped_secrets = self.skipped.len(),
            "synthesized infrastructure"
        );

        Ok(Synthesis {
            graph,
            skipped_secrets: self.skipped.clone(),
        })
    }
}

impl<'a> Route<'a> {
    /// `None` for internal containers.
    pub fn new(container: &'a ContainerSpec, index: usize) -> Option<Self> {
        container.route_path().map(|path| Self {
            container,
            path,
            index,
        })
    }

    pub fn name(&self) -> &'a str {
        &self.container.name
    }

    /// Path without leading or trailing separators, e.g. `v1` for `/v1/`.
    pub fn trimmed_path(&self) -> &'a str {
        self.path.trim_matches('/')
    }

    /// Mounted at the API root (path is `/`).
    pub fn is_root(&self) -> bool {
        self.trimmed_path().is_empty()
    }

    /// Listener rule priority: explicit, or the 1-based position in the service.
    pub fn priority(&self) -> u32 {
        self.container
            .priority
            .unwrap_or_else(|| self.index.saturating_add(1).min(u32::MAX as usize) as u32)
    }

    pub fn target_group_name(&self) -> String {
        format!("{}TargetGroup", self.name())
    }
}

/// Collapse runs of `/` into a single separator.
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}
