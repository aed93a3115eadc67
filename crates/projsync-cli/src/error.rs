use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] projsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Invalid JSON document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Input document is empty: {0}")]
    EmptyInput(String),
}
