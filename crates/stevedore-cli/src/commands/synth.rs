use std::path::PathBuf;

use stevedore_template::{SynthesisOptions, Synthesizer, Template};

use super::{Project, run_tag};
use crate::GlobalArgs;

pub struct SynthArgs {
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub deployment_id: Option<String>,
    pub tag: Option<String>,
}

/// Synthesize the service and merge it into the host template.
pub fn synth(global: &GlobalArgs, args: SynthArgs) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let tag = run_tag(&project.dir, args.tag.as_deref())?;
    let deployment_id = args
        .deployment_id
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

    let synthesizer = Synthesizer::new(&project.config, &project.ctx)?;
    let synthesis = synthesizer.synthesize(&SynthesisOptions { tag, deployment_id })?;

    for skipped in &synthesis.skipped_secrets {
        eprintln!("Skipped secret: {skipped}");
    }

    let mut template = match &args.template {
        Some(path) => Template::load(path)?,
        None => Template::empty(),
    };
    template.merge_graph(&synthesis.graph)?;

    match &args.output {
        Some(path) => {
            template.write(path)?;
            eprintln!(
                "Wrote {} resource(s) to {}",
                synthesis.graph.len(),
                path.display()
            );
        }
        None => println!("{}", template.to_string_pretty()?),
    }

    Ok(())
}
