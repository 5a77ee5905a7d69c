mod build;
mod check;
mod clean_registry;
mod push;
mod restart;
mod run_local;
mod synth;

use std::path::{Path, PathBuf};

use stevedore_core::{ContainerSpec, DeploymentContext, ServiceConfig, StevedoreConfig};

use crate::GlobalArgs;

pub use build::build;
pub use check::{check_post, check_pre};
pub use clean_registry::clean_registry;
pub use push::push;
pub use restart::restart;
pub use run_local::run_local;
pub use synth::{SynthArgs, synth};

/// Normalized configuration of the project in the working directory.
pub(crate) struct Project {
    pub dir: PathBuf,
    pub config: ServiceConfig,
    pub ctx: DeploymentContext,
}

impl Project {
    pub fn load(global: &GlobalArgs) -> anyhow::Result<Self> {
        let dir = PathBuf::from(".");
        let (config, ctx) = StevedoreConfig::load(&dir)?
            .resolve(global.stage.as_deref(), global.region.as_deref())?;

        tracing::debug!(
            service = %ctx.service_name,
            stage = %ctx.stage,
            region = %ctx.region,
            containers = config.containers.len(),
            "loaded project"
        );
        Ok(Self { dir, config, ctx })
    }

    pub fn container(&self, name: &str) -> anyhow::Result<&ContainerSpec> {
        self.config
            .container(name)
            .ok_or_else(|| stevedore_core::Error::UnknownContainer(name.to_owned()).into())
    }

    /// `{registry}/{repository}:{tag}` for a container in this run.
    pub fn image_uri(&self, container: &ContainerSpec, run_tag: &str) -> String {
        self.config.image_uri(container, &self.ctx.region, run_tag)
    }
}

/// The explicit tag, or the source revision of the project.
pub(crate) fn run_tag(project_dir: &Path, explicit: Option<&str>) -> anyhow::Result<String> {
    match explicit {
        Some(tag) => Ok(tag.to_owned()),
        None => Ok(stevedore_build::source_tag(project_dir)?),
    }
}
