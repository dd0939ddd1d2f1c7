//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Project store commands."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use instal_calc_engine::compute;
use instal_common::config::AppConfig;
use instal_persistence::{
    export_csv, MaterialRow, PartidaKind, ProjectMetaPatch, ProjectStore, SaveCalculation,
};
use tracing::info;

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project directory; `store.directory` from the configuration when omitted.
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: ProjectCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create an empty project and print its id.
    New {
        name: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        site: Option<String>,
    },
    /// List projects, most recently updated first.
    List,
    /// Print a project as JSON.
    Show { id: String },
    /// Edit name, client or site address.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        site: Option<String>,
    },
    /// Size an installation and save it under `title`.
    Save {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, short, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "DIR")]
        catalog: Option<PathBuf>,
    },
    /// Delete a project, or one of its partidas with `--partida`.
    Remove {
        id: String,
        #[arg(long)]
        partida: Option<String>,
    },
    /// Aggregated material list as CSV.
    Export {
        id: String,
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

pub fn run(args: ProjectArgs, config: &AppConfig) -> Result<()> {
    let store = ProjectStore::open(args.store.unwrap_or_else(|| config.store.directory.clone()));

    match args.command {
        ProjectCommand::New { name, client, site } => {
            let project = store.create_project(&name, client, site)?;
            println!("{}", project.id);
        }
        ProjectCommand::List => {
            for project in store.list_projects()? {
                println!(
                    "{}\t{}\t{}\t{} partida(s)",
                    project.id,
                    project.name,
                    project.updated_at.to_rfc3339(),
                    project.partidas.len()
                );
            }
        }
        ProjectCommand::Show { id } => {
            let project = store.get_project(&id)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectCommand::Edit {
            id,
            name,
            client,
            site,
        } => {
            let patch = ProjectMetaPatch {
                name,
                client,
                site_address: site,
            };
            store.update_project_meta(&id, patch)?;
        }
        ProjectCommand::Save {
            id,
            title,
            input,
            catalog,
        } => {
            let tables = crate::compute::tables(catalog.as_deref(), config)?;
            let input = crate::compute::read_input(&input, config)?;
            let output = compute(&input, &tables);
            let payload = SaveCalculation {
                title,
                kind: PartidaKind::Electrical,
                inputs: serde_json::to_value(&input)?,
                outputs: serde_json::to_value(&output)?,
                materials: output.bom.iter().map(MaterialRow::from).collect(),
            };
            let project = store.save_or_update_calculation(&id, payload)?;
            info!(project = %project.id, partidas = project.partidas.len(), ok = output.is_ok(), "calculation saved");
            println!("{}", project.partidas.len());
        }
        ProjectCommand::Remove { id, partida } => match partida {
            Some(partida) => {
                store.remove_partida(&id, &partida)?;
            }
            None => store.remove_project(&id)?,
        },
        ProjectCommand::Export { id, output } => {
            let project = store.get_project(&id)?;
            let csv = export_csv(&project)?;
            match output {
                Some(path) => fs::write(&path, csv)
                    .with_context(|| format!("unable to write {}", path.display()))?,
                None => print!("{}", csv),
            }
        }
    }
    Ok(())
}
