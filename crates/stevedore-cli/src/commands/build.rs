use stevedore_build::{ImageBuilder, ImageId};
use stevedore_core::ContainerSpec;

use super::{Project, run_tag};
use crate::GlobalArgs;

/// Build every container image, or only `name`.
pub async fn build(global: &GlobalArgs, name: Option<&str>, tag: Option<&str>) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let tag = run_tag(&project.dir, tag)?;
    let builder = ImageBuilder::new();

    let containers: Vec<&ContainerSpec> = match name {
        Some(name) => vec![project.container(name)?],
        None => project.config.containers.iter().collect(),
    };

    for container in containers {
        let (image, reference) = build_image(&builder, &project, container, &tag).await?;
        println!("Built {} -> {reference} ({image})", container.name);
    }

    Ok(())
}

/// Build one container's image under its local name (`{repository}:{tag}`)
/// and tag it with its registry URI.
pub(crate) async fn build_image(
    builder: &ImageBuilder,
    project: &Project,
    container: &ContainerSpec,
    run_tag: &str,
) -> anyhow::Result<(ImageId, String)> {
    let local = format!(
        "{}:{}",
        project.config.repository_name(container),
        container.effective_tag(run_tag)
    );
    println!("Building {}...", container.name);
    let image = builder
        .build_container(&project.dir, container, std::slice::from_ref(&local))
        .await?;

    let reference = project.image_uri(container, run_tag);
    builder.tag(image.as_str(), &reference).await?;
    Ok((image, reference))
}
