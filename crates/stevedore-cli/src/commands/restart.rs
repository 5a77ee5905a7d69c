use stevedore_cloud::AwsClient;

use super::{Project, run_tag};
use crate::GlobalArgs;

pub async fn restart(global: &GlobalArgs, tag: Option<&str>) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let tag = run_tag(&project.dir, tag)?;
    let service = project.ctx.service_identifier(&tag);

    println!("Forcing new deployment of {service}...");
    AwsClient::new()
        .force_new_deployment(&project.config.cluster, &service, &project.ctx.region)
        .await?;
    println!("Deployment started.");
    Ok(())
}
