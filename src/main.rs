//! nexus — versioned model artifacts in cloud object storage.
//!
//! Thin command-line front over the registry façade: every subcommand wires
//! `.nexusrc` → storage backend → registry, runs one operation, and prints
//! the outcome. All policy lives in the library crates.

use clap::{Parser, Subcommand};
use nexus_config::Config;
use nexus_index::VersionSelector;
use nexus_registry::Registry;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nexus", version, about = "Versioned model artifacts in cloud object storage")]
struct Cli {
    /// Project root containing `.nexusrc` and the index snapshot.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an artifact and record it as the model's newest version.
    Push {
        /// Local artifact file.
        file: PathBuf,
        /// Model the artifact belongs to.
        #[arg(long)]
        model: String,
        /// Version id; defaults to the BLAKE3 hash of the file contents.
        #[arg(long)]
        version: Option<String>,
    },
    /// Download a version of a model.
    Pull {
        /// Model to download.
        model: String,
        /// Version id, or `latest`.
        #[arg(long, default_value = VersionSelector::LATEST)]
        version: String,
        /// Destination path; defaults to `<model>.<extension>`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List every recorded version of every model.
    List,
    /// Repoint a model's latest pointer at an already-recorded version.
    Rollback {
        /// Model whose pointer to move.
        model: String,
        /// Version id to promote.
        version: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Debug-print renders the full exn error tree with locations.
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(root = %cli.root.display(), "opening registry");
    let config = Config::load(&cli.root)?;
    let backend = nexus_storage::backend::for_provider(&config)?;
    let mut registry = Registry::open(&cli.root, backend).await?;
    match cli.command {
        Command::Push { file, model, version } => {
            let record = registry.push(&file, &model, version.as_deref()).await?;
            println!(
                "pushed {} as {}/{} ({} bytes) -> {}",
                file.display(),
                model,
                record.version_id,
                record.byte_size,
                record.remote_key
            );
        },
        Command::Pull { model, version, output } => {
            let selector = VersionSelector::from(version.as_str());
            let destination = match output {
                Some(path) => path,
                None => default_output(&registry, &model, &selector)?,
            };
            let path = registry.pull(&model, &selector, &destination).await?;
            println!("pulled {model} ({selector}) -> {}", path.display());
        },
        Command::List => {
            let entries = registry.list();
            if entries.is_empty() {
                println!("no models recorded");
            }
            for entry in entries {
                println!(
                    "{} {:<24} {:<20} {:>12} {}",
                    if entry.is_latest { "*" } else { " " },
                    entry.model_name,
                    entry.version_id,
                    entry.byte_size,
                    entry.remote_key
                );
            }
        },
        Command::Rollback { model, version } => {
            registry.rollback(&version, &model).await?;
            println!("latest for {model} now points at {version}");
        },
    }
    Ok(())
}

/// Default download destination: the model name plus the resolved record's
/// own extension.
fn default_output(
    registry: &Registry,
    model: &str,
    selector: &VersionSelector,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let record = registry.index().record(selector, model)?;
    Ok(match record.file_extension.is_empty() {
        true => PathBuf::from(model),
        false => PathBuf::from(format!("{model}.{}", record.file_extension)),
    })
}
