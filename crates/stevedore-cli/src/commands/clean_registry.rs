use std::io::Write;

use stevedore_cloud::{AwsClient, RegistryError};

use super::Project;
use crate::GlobalArgs;

/// Force-delete the repository of every container, images included.
pub async fn clean_registry(global: &GlobalArgs, skip_confirm: bool) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let region = &project.ctx.region;
    let repositories: Vec<String> = project
        .config
        .containers
        .iter()
        .map(|c| project.config.repository_name(c))
        .collect();

    if !skip_confirm {
        println!("This will delete, including all images:");
        for name in &repositories {
            println!("  - ECR repository '{name}' in {region}");
        }

        println!();
        print!("Are you sure? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !matches!(input.trim(), "y" | "Y" | "yes" | "YES") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let client = AwsClient::new();
    for name in &repositories {
        match client.delete_repository(name, region, true).await {
            Ok(()) => println!("Deleted repository {name}"),
            Err(RegistryError::NotFound { .. }) => println!("Skipped {name} (does not exist)"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
