use thiserror::Error;

use crate::config::ConfigError;

/// Anything that stops the service from starting or keeps it from serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
