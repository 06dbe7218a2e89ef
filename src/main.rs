//! cellar - keg-style installer for pre-built binary packages

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "cellar")]
#[command(author, version, about = "cellar - manifest-driven binary package installer")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package from a manifest file
    Install {
        /// Path to the package manifest (TOML)
        manifest: PathBuf,
    },
    /// Validate a manifest without installing anything
    Check {
        /// Path to the package manifest (TOML)
        manifest: PathBuf,
    },
    /// List installed packages
    List,
    /// Remove an installed package (generated config is kept)
    Remove {
        /// Package name
        package: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Install { manifest } => cmd::install::install_manifest(&manifest, dry_run).await,
        Commands::Check { manifest } => cmd::check::check(&manifest),
        Commands::List => cmd::list::list(),
        Commands::Remove { package } => cmd::remove::remove(&package, dry_run),
    }
}
