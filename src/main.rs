// src/main.rs

//! The main entry point for the Fluxgate transfer node.

use anyhow::Result;
use fluxgate::config::ConfigStore;
use fluxgate::server;
use std::env;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("Fluxgate version {VERSION}");
        return Ok(());
    }

    // Determine the configuration path. It can be provided via -c/--config;
    // otherwise it defaults to "cfg.json" in the working directory.
    let config_path = args
        .iter()
        .position(|arg| arg == "-c" || arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("cfg.json");

    // A node with no valid topology must not run at all, so a broken or
    // missing config file ends the process right here.
    let store = match ConfigStore::open(config_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };

    // RUST_LOG wins; otherwise the config's debug flag picks the level.
    let default_level = if store.snapshot().debug { "debug" } else { "info" };
    let filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = server::run(Arc::new(store)).await {
        error!("Node runtime error: {e:#}");
        return Err(e);
    }

    Ok(())
}
