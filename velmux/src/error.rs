use std::time::Duration;

use thiserror::Error;

use crate::BaseVelocity;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("velmux: Source {:?} is already registered", .0)]
    DuplicateSource(String),
    #[error("velmux: Timeout of source {:?} must be positive, but {:?}", id, timeout)]
    NonPositiveTimeout { id: String, timeout: Duration },
    #[error("velmux: Timeout of source {:?} is not a valid duration: {} seconds", id, seconds)]
    InvalidTimeout { id: String, seconds: f64 },
    #[error("velmux: Invalid velocity limits: {}", .0)]
    InvalidVelocityLimits(String),
    #[error("velmux: Lock refers to unregistered source {:?}", .0)]
    UnknownLockSource(String),
    #[error("velmux: No source={} is registered", .0)]
    UnknownSource(String),
    #[error("velmux: Invalid command from source {:?}: {:?}", id, command)]
    InvalidCommand { id: String, command: BaseVelocity },
    #[error("velmux: Connection error : {}", message)]
    Connection { message: String },
    #[error("velmux: Other: {:?}", .0)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Returns `true` for invalid static configuration, which is fatal at startup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSource(_)
                | Self::NonPositiveTimeout { .. }
                | Self::InvalidTimeout { .. }
                | Self::InvalidVelocityLimits(_)
                | Self::UnknownLockSource(_)
        )
    }
}
