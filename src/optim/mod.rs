//! Optimization: losses, the optimizer step, pretraining and the training loop.
//!
//! - `loss`: BCE/MSE and the per-step loss records
//! - `step`: one optimizer step for an explicitly chosen network
//! - `pretrain`: pixel-loss generator warm-up (SRResNet)
//! - `trainer`: discriminator/generator alternation and periodic side effects

pub mod loss;
pub mod pretrain;
pub mod step;
pub mod trainer;

pub use loss::{DiscriminatorLossRecord, LossRecord};
pub use step::{adam_optimizers, GanOptimizers, Trainable};
pub use trainer::{
    discriminator_step, generator_step, train, train_step, StepLosses, TrainingSummary,
};
