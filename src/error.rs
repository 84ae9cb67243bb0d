//! Application-wide error types.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("logger error: {0}")]
    Logger(String),
}
