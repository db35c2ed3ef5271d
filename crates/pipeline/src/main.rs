//! `design-pipeline` command line.
//!
//! - `design-pipeline build` - generate every module and publish its STL
//! - `design-pipeline catalog` - write module documents and the catalog
//! - `design-pipeline all` - build, then catalog
//! - `design-pipeline check` - validate modules without writing anything
//! - `design-pipeline inspect <ID>` - print geometry stats for one module

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use design_pipeline::{Pipeline, PipelineConfig, RunStatus};

#[derive(Parser)]
#[command(name = "design-pipeline")]
#[command(about = "Build parametric design modules and their catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root; relative config paths resolve against it
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (defaults to design-pipeline.json in the project root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the directory walked for design modules
    #[arg(long, global = true)]
    design_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every module and publish its STL artifact
    Build,
    /// Write per-module documents and the aggregate catalog
    Catalog,
    /// Build, then compile the catalog
    All,
    /// Discover and validate modules without writing anything
    Check,
    /// Build one module in memory and print its geometry as JSON
    Inspect {
        #[arg(name = "ID")]
        id: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "design_pipeline=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("{:#}", e);
            RunStatus::Fatal
        }
    };
    ExitCode::from(status.exit_code() as u8)
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .anchored(&root),
        None => PipelineConfig::for_project(&root)?,
    };
    if let Some(design_root) = &cli.design_root {
        config.design_root = root.join(design_root);
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<RunStatus> {
    let pipeline = Pipeline::new(load_config(&cli)?);

    let status = match cli.command {
        Commands::Build => pipeline.build()?.status(),
        Commands::Catalog => pipeline.catalog()?.status(),
        Commands::All => {
            let built = pipeline.build()?.status();
            let compiled = pipeline.catalog()?.status();
            built.max(compiled)
        }
        Commands::Check => pipeline.check()?.status(),
        Commands::Inspect { id } => {
            let inspection = pipeline
                .inspect(&id)
                .with_context(|| format!("Failed to inspect '{}'", id))?;
            println!("{}", serde_json::to_string_pretty(&inspection)?);
            RunStatus::Success
        }
    };
    Ok(status)
}
