//! Crate-level errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::output::OutputError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("output: {0}")]
    Output(#[from] OutputError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
