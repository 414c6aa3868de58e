use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use lakevec::{pipeline, MatchingPolicy, RunConfig};
use lakevec_cli::{write_skeleton, RunArgs};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Vectorize lake masks against a reference lake database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vectorize a mask from a config file and/or flags
    Run(RunArgs),
    /// Write a skeleton configuration file
    Init {
        /// Destination (.toml or .json)
        #[arg(short, long, default_value = "lakevec.toml")]
        output: PathBuf,
    },
    /// Print the JSON schema of the configuration file
    Schema,
    /// List the matching policies
    Policies,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let config = args.resolve()?;
            info!(
                raster = %config.raster.display(),
                references = %config.references.display(),
                policy = %config.matching.matching_policy,
                "starting run"
            );
            let summary = pipeline::run(&config)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Init { output } => {
            write_skeleton(output)?;
            info!("Wrote skeleton configuration to {}", output.display());
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&RunConfig::schema())?);
        }
        Commands::Policies => {
            for policy in MatchingPolicy::all() {
                println!("{:<18} {}", policy.to_string(), policy.description());
            }
        }
    }

    Ok(())
}

