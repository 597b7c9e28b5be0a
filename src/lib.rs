//! # srgan-rs: adversarial single-image super-resolution in Rust
//!
//! This crate trains an SRGAN-style model: a residual generator that upsamples a
//! low-resolution image by a power-of-two factor, a patch discriminator judging
//! high-resolution images, and a frozen VGG19 truncation supplying a perceptual
//! loss. Tensors and autodiff come from `burn`.
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//!
//! - `core`: Configuration, errors, value-range conversions, PSNR
//! - `model`: Generator, discriminator, feature extractor and their composite
//! - `optim`: Losses, the optimizer step, pretraining and the training loop
//! - `io`: Datasets, checkpoints, loss log, sample images
//!
//! ## Training in one paragraph
//!
//! Each epoch draws a real batch, lets the generator produce fakes without a
//! graph, updates the discriminator on real-then-fake, draws a second batch and
//! updates the generator through the composite, whose discriminator runs on
//! frozen batch-norm statistics. Which network an update touches is always an
//! explicit [`optim::Trainable`] argument.

// Configuration, errors, metrics
pub mod core;

// File formats and data sources
pub mod io;

// Networks
pub mod model;

// Losses and training
pub mod optim;

// Re-export commonly used types at crate root for convenience
pub use core::{Error, ModelConfig, PretrainMode, Result, TrainingConfig};
pub use model::AdversarialModel;
pub use optim::{train, TrainingSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
