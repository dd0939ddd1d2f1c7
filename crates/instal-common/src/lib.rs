//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared configuration and logging for the instal tools."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Configuration loading and tracing setup consumed by the CLI and any
//! embedding service.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, CatalogConfig, EngineConfig, LoadedAppConfig, LoggingConfig, ReportsConfig,
    StoreConfig,
};
pub use logging::{init_tracing, LogFormat};
