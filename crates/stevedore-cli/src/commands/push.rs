use stevedore_build::ImageBuilder;
use stevedore_cloud::AwsClient;

use super::build::build_image;
use super::{Project, run_tag};
use crate::GlobalArgs;

/// Ensure repositories exist, then build and push every container image.
///
/// Stops at the first failure so no template ever references an image
/// that was not published.
pub async fn push(global: &GlobalArgs, tag: Option<&str>) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let tag = run_tag(&project.dir, tag)?;
    let region = &project.ctx.region;
    let account = &project.config.registry.account_id;

    let client = AwsClient::new();
    let builder = ImageBuilder::new();

    println!("Ensuring ECR repositories...");
    for container in &project.config.containers {
        let name = project.config.repository_name(container);
        let repository = client.ensure_repository(account, &name, region).await?;
        println!("  {}", repository.repository_uri);
    }

    let registry = project.config.registry_host(region);
    println!("Logging in to {registry}...");
    let password = client.login_password(region).await?;
    builder.login(&registry, &password).await?;

    for container in &project.config.containers {
        let (_, reference) = build_image(&builder, &project, container, &tag).await?;
        builder.push(&reference).await?;
        println!("Pushed {reference}");
    }

    println!();
    println!("Push complete ({} image(s), tag {tag}).", project.config.containers.len());
    Ok(())
}
