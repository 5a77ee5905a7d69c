use stevedore_build::{ImageBuilder, LocalRun};
use stevedore_template::effective_environment;

use super::build::build_image;
use super::Project;
use crate::GlobalArgs;

const LOCAL_TAG: &str = "local";

/// Build a container and run it with the environment it gets in the task.
pub async fn run_local(global: &GlobalArgs, name: &str, port: Option<u16>) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let container = project.container(name)?;
    let builder = ImageBuilder::new();

    let (_, reference) = build_image(&builder, &project, container, LOCAL_TAG).await?;

    if !container.secrets.is_empty() {
        tracing::warn!(
            container = %container.name,
            secrets = container.secrets.len(),
            "secrets are not injected into local runs"
        );
    }

    let run = LocalRun {
        host_port: port.unwrap_or(container.port),
        container_port: container.port,
        environment: effective_environment(&project.ctx, container)
            .into_iter()
            .collect(),
    };

    println!(
        "Running {} on http://localhost:{} (Ctrl-C to stop)",
        container.name, run.host_port
    );
    builder.run_local(&reference, &run).await?;
    Ok(())
}
