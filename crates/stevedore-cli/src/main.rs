mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stevedore",
    about = "Ship container services to ECS Fargate behind API Gateway"
)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `[service]` section of stevedore.toml.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Deployment stage (default: from stevedore.toml)
    #[arg(long, global = true)]
    stage: Option<String>,
    /// AWS region (default: from stevedore.toml)
    #[arg(long, global = true)]
    region: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build container images, tagged with their registry URI
    Build {
        /// Build only this container
        #[arg(long)]
        name: Option<String>,
        /// Image tag (default: short git revision)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Build one container and run it locally
    RunLocal {
        /// Container name
        name: String,
        /// Host port (default: the container port)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Create missing repositories, then build and push every image
    Push {
        /// Image tag (default: short git revision)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Synthesize CloudFormation resources into a template
    Synth {
        /// Host template to merge into
        #[arg(long)]
        template: Option<PathBuf>,
        /// Write the merged template here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Suffix of the API deployment resource (default: current time in ms)
        #[arg(long)]
        deployment_id: Option<String>,
        /// Image tag (default: short git revision)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Delete every container repository, including its images
    CleanRegistry {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Force a new deployment of the running service
    Restart {
        /// Image tag the service was deployed with (default: short git revision)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Deploy hooks that detect a service the stack update did not roll
    Check {
        #[command(subcommand)]
        phase: CheckPhase,
    },
}

#[derive(Subcommand)]
enum CheckPhase {
    /// Record the deploy start time
    Pre,
    /// Force a new deployment if the service was not updated since `check pre`
    Post {
        /// Image tag the service was deployed with (default: short git revision)
        #[arg(long)]
        tag: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = &cli.global;

    match cli.command {
        Commands::Build { name, tag } => {
            commands::build(global, name.as_deref(), tag.as_deref()).await?
        }
        Commands::RunLocal { name, port } => commands::run_local(global, &name, port).await?,
        Commands::Push { tag } => commands::push(global, tag.as_deref()).await?,
        Commands::Synth {
            template,
            output,
            deployment_id,
            tag,
        } => commands::synth(
            global,
            commands::SynthArgs {
                template,
                output,
                deployment_id,
                tag,
            },
        )?,
        Commands::CleanRegistry { yes } => commands::clean_registry(global, yes).await?,
        Commands::Restart { tag } => commands::restart(global, tag.as_deref()).await?,
        Commands::Check { phase } => match phase {
            CheckPhase::Pre => commands::check_pre()?,
            CheckPhase::Post { tag } => commands::check_post(global, tag.as_deref()).await?,
        },
    }

    Ok(())
}
