//! Training and model configuration.
//!
//! Every hyperparameter lives in an explicit, immutable [`TrainingConfig`] that is
//! handed to constructors. Nothing reads configuration from globals.
//!
//! The defaults reproduce the reference SRGAN run: 64×64 inputs upscaled 16× to
//! 1024×1024, 16 residual blocks, Adam at 2e-4, and an adversarial/perceptual
//! weighting of 1e-3 / 6e-3.

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Total spatial downsampling of the discriminator (four stride-2 blocks).
pub const DISCRIMINATOR_STRIDE: usize = 16;

/// Configuration validation failures.
///
/// These are raised by [`ModelConfig::validate`] / [`TrainingConfig::validate`]
/// before any layer is allocated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("upscale factor {0} is not a power of two >= 2")]
    UpscaleNotPowerOfTwo(usize),

    #[error("high-resolution size {0} is not divisible by 16 (discriminator downsampling)")]
    HighResNotDivisible(usize),

    #[error("`{0}` must be at least 1")]
    Zero(&'static str),

    #[error("`{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
}

/// What to do with the generator before adversarial training starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PretrainMode {
    /// Start from random initialization.
    #[default]
    Off,
    /// Train the generator alone on pixel MSE (SRResNet), then save it.
    Pretrain,
    /// Load a previously saved SRResNet generator. Missing file is an error.
    LoadPretrained,
}

/// Objective used for the discriminator's own update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscriminatorLoss {
    /// Least-squares objective against the 0/1 patch targets.
    #[default]
    Mse,
    /// Binary cross-entropy against the 0/1 patch targets.
    Bce,
}

/// Architecture hyperparameters shared by all three networks.
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Integer upscale factor. Must be a power of two.
    #[config(default = 16)]
    pub upscale: usize,
    /// Side length of the (square) low-resolution input.
    #[config(default = 64)]
    pub input_dim: usize,
    /// Number of generator residual blocks.
    #[config(default = 16)]
    pub residual_blocks: usize,
    #[config(default = 64)]
    pub generator_filters: usize,
    #[config(default = 256)]
    pub upsample_filters: usize,
    /// Filters of the first discriminator block; doubled every two blocks.
    #[config(default = 64)]
    pub discriminator_filters: usize,
}

impl ModelConfig {
    /// Side length of the high-resolution images.
    pub fn high_res_dim(&self) -> usize {
        self.input_dim * self.upscale
    }

    /// Side length of the discriminator's patch grid.
    pub fn patch_dim(&self) -> usize {
        self.high_res_dim() / DISCRIMINATOR_STRIDE
    }

    /// Number of 2× upsampling stages, i.e. `log2(upscale)`.
    pub fn upsample_stages(&self) -> Result<usize, ConfigError> {
        if self.upscale < 2 || !self.upscale.is_power_of_two() {
            return Err(ConfigError::UpscaleNotPowerOfTwo(self.upscale));
        }
        Ok(self.upscale.trailing_zeros() as usize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upsample_stages()?;
        for (name, value) in [
            ("input_dim", self.input_dim),
            ("residual_blocks", self.residual_blocks),
            ("generator_filters", self.generator_filters),
            ("upsample_filters", self.upsample_filters),
            ("discriminator_filters", self.discriminator_filters),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        let high_res = self.high_res_dim();
        if high_res % DISCRIMINATOR_STRIDE != 0 {
            return Err(ConfigError::HighResNotDivisible(high_res));
        }
        Ok(())
    }
}

/// Full configuration of a training run.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    /// Directory of training images.
    pub data_dir: String,
    /// Directory receiving samples, logs and checkpoints.
    pub output_dir: String,
    #[config(default = 2e-4)]
    pub learning_rate: f64,
    #[config(default = 10000)]
    pub epochs: usize,
    #[config(default = 1)]
    pub batch_size: usize,
    #[config(default = "PretrainMode::Off")]
    pub pretrain: PretrainMode,
    #[config(default = 100)]
    pub pretrain_epochs: usize,
    #[config(default = 8)]
    pub pretrain_batch_size: usize,
    #[config(default = 200)]
    pub pretrain_images: usize,
    /// Qualitative samples rendered once pretraining finishes.
    #[config(default = 20)]
    pub sample_count: usize,
    /// Qualitative samples rendered at each periodic sampling event.
    #[config(default = 2)]
    pub samples_per_event: usize,
    #[config(default = 100)]
    pub log_interval: usize,
    #[config(default = 10000)]
    pub checkpoint_interval: usize,
    #[config(default = 2500)]
    pub generator_interval: usize,
    #[config(default = 50)]
    pub sample_interval: usize,
    #[config(default = 1e-3)]
    pub adversarial_weight: f64,
    #[config(default = 6e-3)]
    pub perceptual_weight: f64,
    /// Weight of an extra pixel-space MSE term on the generator. Off by default.
    #[config(default = 0.0)]
    pub pixel_weight: f64,
    #[config(default = "DiscriminatorLoss::Mse")]
    pub discriminator_loss: DiscriminatorLoss,
    #[config(default = 42)]
    pub seed: u64,
    /// Burn record holding pretrained feature-extractor weights.
    pub vgg_weights: Option<String>,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        for (name, value) in [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("log_interval", self.log_interval),
            ("checkpoint_interval", self.checkpoint_interval),
            ("generator_interval", self.generator_interval),
            ("sample_interval", self.sample_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.pretrain == PretrainMode::Pretrain {
            for (name, value) in [
                ("pretrain_epochs", self.pretrain_epochs),
                ("pretrain_batch_size", self.pretrain_batch_size),
                ("pretrain_images", self.pretrain_images),
            ] {
                if value == 0 {
                    return Err(ConfigError::Zero(name));
                }
            }
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("adversarial_weight", self.adversarial_weight),
            ("perceptual_weight", self.perceptual_weight),
            ("pixel_weight", self.pixel_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}
