#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone hotspot map API server.
//!
//! The hot-spot source comes from the TOML file named by
//! `HOTSPOT_MAP_CONFIG` when set, otherwise from the environment.

use std::path::Path;

use hotspot_map_query::SourceConfig;
use hotspot_map_server::{ServerConfig, run_server};

/// Path of an optional TOML config with a `[source]` table.
const CONFIG_ENV: &str = "HOTSPOT_MAP_CONFIG";

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let source_config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            log::info!("Loading source config from {path}");
            SourceConfig::load(Path::new(&path))?
        }
        Err(_) => SourceConfig::from_env()?,
    };
    let source = source_config.build().await?;

    run_server(source, ServerConfig::from_env()).await?;
    Ok(())
}
