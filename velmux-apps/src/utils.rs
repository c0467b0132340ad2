use std::path::PathBuf;

use tracing::warn;
use tracing_subscriber::EnvFilter;

const VELMUX_CONFIG_ENV_NAME: &str = "VELMUX_CONFIG_PATH";

/// Get mux config path from input or env VELMUX_CONFIG_PATH
pub fn get_config_path(config: Option<PathBuf>) -> Option<PathBuf> {
    if config.is_some() {
        config
    } else {
        std::env::var(VELMUX_CONFIG_ENV_NAME)
            .map(|s| {
                warn!("### ENV VAR {} is used ###", s);
                PathBuf::from(s)
            })
            .ok()
    }
}

/// Installs the log subscriber. Logs go to stderr, stdout carries the output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
