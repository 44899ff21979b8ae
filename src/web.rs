#![cfg(not(tarpaulin_include))]

use orderdesk::{app, config};
use std::env;
use std::path::PathBuf;

/// Main entry point for the order entry web server
///
/// Usage: `orderdesk-web [config.toml]`. Without an argument the settings
/// come from `orderdesk.toml` if present, then `ORDERDESK_*` variables.
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let settings = config::load_settings(config_path.as_deref())?;

    app::run(settings).await
}
