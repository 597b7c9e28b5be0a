//! Library error type.

use std::path::PathBuf;
use thiserror::Error;

use super::config::ConfigError;

/// Errors that can occur while building, training or checkpointing the models.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("shape mismatch: reference shape = {reference:?}, candidate shape = {candidate:?}")]
    ShapeMismatch {
        reference: Vec<usize>,
        candidate: Vec<usize>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("checkpoint `{}` not found", .0.display())]
    MissingCheckpoint(PathBuf),

    #[error("failed to read or write checkpoint `{}`: {reason}", path.display())]
    Checkpoint { path: PathBuf, reason: String },

    #[error("tensor data error: {0}")]
    TensorData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
