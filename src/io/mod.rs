//! Everything that crosses the filesystem boundary.
//!
//! - `dataset`: paired high-/low-res batches (image folders, synthetic data)
//! - `checkpoint`: burn record files for the networks
//! - `loss_log`: append-only `loss.txt`
//! - `samples`: PNG samples and `psnr.txt`

pub mod checkpoint;
pub mod dataset;
pub mod loss_log;
pub mod samples;

// Re-export public types and functions
pub use checkpoint::{load_generator, save_composite, save_generator};
pub use dataset::{ImageFolderSource, ImagePairBatch, PairSource, SyntheticSource};
pub use loss_log::LossLog;
pub use samples::write_samples;
