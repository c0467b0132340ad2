use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("velmux-apps: Failed to parse {:?} as toml ({}).", .0, .1)]
    TomlParseFailure(PathBuf, #[source] toml::de::Error),
    #[error("velmux-apps: No File {:?} is found ({}).", .0, .1)]
    NoFile(PathBuf, #[source] std::io::Error),
    #[error("velmux-apps: publish_rate must be a positive number, but {}", .0)]
    InvalidPublishRate(f64),
    #[error("velmux-apps: Invalid line {:?}: {}", line, message)]
    InvalidLine { line: String, message: String },
    #[error("velmux-apps: velmux: {:?}", .0)]
    Velmux(#[from] velmux::Error),
}
