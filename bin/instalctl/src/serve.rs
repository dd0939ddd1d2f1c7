//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "HTTP surface for the sizing engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use instal_calc_engine::api;
use instal_common::config::AppConfig;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::compute;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    /// Directory with lookup tables; bundled tables when omitted.
    #[arg(long, value_name = "DIR")]
    catalog: Option<PathBuf>,
}

pub fn run(args: ServeArgs, config: &AppConfig) -> Result<()> {
    let tables = compute::tables(args.catalog.as_deref(), config)?;
    for issue in tables.validate() {
        warn!(%issue, "catalog issue");
    }
    let router = api::router(tables);

    let runtime = Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(args.listen).await?;
        info!(listen = %args.listen, "serving sizing api");
        axum::serve(listener, router).await?;
        Ok::<(), anyhow::Error>(())
    })
}
