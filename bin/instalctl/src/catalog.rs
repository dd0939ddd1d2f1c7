//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Lookup table validation command."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use instal_common::config::AppConfig;

use crate::compute;

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Report inconsistencies in the lookup tables.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Directory with lookup tables; bundled tables when omitted.
    #[arg(long, value_name = "DIR")]
    catalog: Option<PathBuf>,
}

pub fn run(command: CatalogCommand, config: &AppConfig) -> Result<()> {
    match command {
        CatalogCommand::Validate(args) => {
            let tables = compute::tables(args.catalog.as_deref(), config)?;
            let issues = tables.validate();
            if issues.is_empty() {
                println!("catalog ok");
                return Ok(());
            }
            for issue in &issues {
                println!("{}", issue);
            }
            bail!("{} catalog issue(s) found", issues.len())
        }
    }
}
