//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for sizing residential installations."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use instal_common::{config::AppConfig, logging};

mod catalog;
mod compute;
mod project;
#[cfg(feature = "rest-api")]
mod serve;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Residential circuit sizing utility",
    long_about = None
)]
struct Cli {
    /// Configuration file; INSTAL_CONFIG or ./instal.toml when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Size every circuit of an installation")]
    Compute(compute::ComputeArgs),
    #[command(subcommand, about = "Lookup table checks")]
    Catalog(catalog::CatalogCommand),
    #[command(about = "Manage saved projects")]
    Project(project::ProjectArgs),
    #[cfg(feature = "rest-api")]
    #[command(about = "Serve the sizing engine over HTTP")]
    Serve(serve::ServeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Compute(args) => {
            logging::init();
            compute::run(args, &config)?
        }
        Commands::Catalog(cmd) => {
            logging::init();
            catalog::run(cmd, &config)?
        }
        Commands::Project(args) => {
            logging::init();
            project::run(args, &config)?
        }
        #[cfg(feature = "rest-api")]
        Commands::Serve(args) => {
            logging::init_tracing("instalctl", &config.logging)?;
            serve::run(args, &config)?
        }
    }
    Ok(())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_path(path);
    }
    AppConfig::load(&[PathBuf::from("instal.toml"), PathBuf::from("configs/instal.toml")])
}
