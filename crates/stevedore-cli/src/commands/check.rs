use std::path::PathBuf;

use chrono::Utc;
use stevedore_cloud::{
    AwsClient, clear_deploy_start, primary_is_stale, read_deploy_start, record_deploy_start,
};

use super::{Project, run_tag};
use crate::GlobalArgs;

/// Record the start of a deploy for `check post`.
pub fn check_pre() -> anyhow::Result<()> {
    let path = record_deploy_start(&PathBuf::from("."), Utc::now())?;
    println!("Recorded deploy start in {}", path.display());
    Ok(())
}

/// Force a new deployment when the stack update left the service untouched.
///
/// Failing to describe the service is logged and skipped; the deploy itself
/// already succeeded at this point. The marker is kept for a retry then, and
/// removed once the service is known to be current.
pub async fn check_post(global: &GlobalArgs, tag: Option<&str>) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let Some(started) = read_deploy_start(&project.dir)? else {
        anyhow::bail!("no deploy start recorded, run `stevedore check pre` before deploying");
    };

    let tag = run_tag(&project.dir, tag)?;
    let service = project.ctx.service_identifier(&tag);
    let cluster = &project.config.cluster;
    let region = &project.ctx.region;
    let client = AwsClient::new();

    let deployments = match client
        .describe_service_deployments(cluster, &service, region)
        .await
    {
        Ok(deployments) => deployments,
        Err(e) => {
            tracing::warn!(%service, error = %e, "skipping post-deploy check");
            return Ok(());
        }
    };

    if primary_is_stale(&deployments, started) {
        println!("{service} was not updated since {started}, forcing new deployment...");
        client.force_new_deployment(cluster, &service, region).await?;
    } else {
        println!("{service} is up to date.");
    }

    clear_deploy_start(&project.dir)?;
    Ok(())
}
