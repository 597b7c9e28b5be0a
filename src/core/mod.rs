//! Core types shared by every other module.
//!
//! - `config`: explicit, validated run configuration
//! - `error`: library error type
//! - `color`: value-range conversions between files and network tensors
//! - `metrics`: PSNR
//!
//! Nothing here trains or touches the filesystem.

pub mod color;
pub mod config;
mod error;
pub mod metrics;

// Re-export public types
pub use config::{ConfigError, DiscriminatorLoss, ModelConfig, PretrainMode, TrainingConfig};
pub use error::{Error, Result};
pub use metrics::psnr;
