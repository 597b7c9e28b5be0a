//! Generator → {discriminator, feature extractor} coupling used for the
//! generator's update.
//!
//! The composite owns all three networks. Only the generator's gradients are
//! ever extracted from a composite loss (see [`crate::optim::step`]), the
//! discriminator is evaluated with [`Discriminator::forward_frozen`] and the
//! extractor's parameters never require gradients, so one backward pass through
//! the composite moves the generator and nothing else.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::warn;

use super::discriminator::Discriminator;
use super::feature::FeatureExtractor;
use super::generator::Generator;
use crate::core::{DiscriminatorLoss, Error, Result, TrainingConfig};
use crate::optim::loss::{binary_cross_entropy, mean_squared_error, scalar_value, LossRecord};

/// Weights of the generator's loss terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    pub adversarial: f64,
    pub perceptual: f64,
    /// Extra pixel-space MSE. Zero disables the term.
    pub pixel: f64,
}

impl Default for LossWeights {
    /// The tuned 1e-3 / 6e-3 adversarial/perceptual ratio, no pixel term.
    fn default() -> Self {
        Self {
            adversarial: 1e-3,
            perceptual: 6e-3,
            pixel: 0.0,
        }
    }
}

impl From<&TrainingConfig> for LossWeights {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            adversarial: config.adversarial_weight,
            perceptual: config.perceptual_weight,
            pixel: config.pixel_weight,
        }
    }
}

/// What the composite sees for one low-res batch.
#[derive(Debug)]
pub struct CompositeOutput<B: Backend> {
    pub generated: Tensor<B, 4>,
    pub validity: Tensor<B, 4>,
    pub features: Tensor<B, 4>,
}

/// Scalar loss to backpropagate plus its logged breakdown.
#[derive(Debug)]
pub struct GeneratorLoss<B: Backend> {
    pub total: Tensor<B, 1>,
    pub record: LossRecord,
}

/// The three networks plus the loss settings fixed at construction.
#[derive(Debug)]
pub struct AdversarialModel<B: AutodiffBackend> {
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
    pub extractor: FeatureExtractor<B>,
    pub discriminator_objective: DiscriminatorLoss,
    weights: LossWeights,
}

impl<B: AutodiffBackend> AdversarialModel<B> {
    /// Build all three networks. The configuration is validated before any layer
    /// is allocated.
    pub fn new(config: &TrainingConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let model = &config.model;
        let high_res = model.high_res_dim();

        let extractor = match &config.vgg_weights {
            Some(path) => FeatureExtractor::pretrained(high_res, Path::new(path), device)?,
            None => {
                warn!("no VGG weights configured, perceptual loss uses a random extractor");
                FeatureExtractor::new(high_res, device)
            }
        };

        Ok(Self {
            generator: model.init_generator(device)?,
            discriminator: model.init_discriminator(device)?,
            extractor,
            discriminator_objective: config.discriminator_loss,
            weights: LossWeights::from(config),
        })
    }

    pub fn weights(&self) -> LossWeights {
        self.weights
    }

    /// `low_res` → `(generated, D_frozen(generated), F(generated))`.
    pub fn forward(&self, low_res: Tensor<B, 4>) -> Result<CompositeOutput<B>> {
        self.check_low_res(&low_res)?;
        let generated = self.generator.forward(low_res);
        let validity = self.discriminator.forward_frozen(generated.clone());
        let features = self.extractor.extract(generated.clone())?;
        Ok(CompositeOutput {
            generated,
            validity,
            features,
        })
    }

    /// Generator output without building an autodiff graph.
    pub fn generate(&self, low_res: Tensor<B, 4>) -> Result<Tensor<B::InnerBackend, 4>> {
        self.check_low_res(&low_res)?;
        Ok(self.generator.valid().forward(low_res.inner()))
    }

    /// Perceptual targets `F(high_res)`, computed without an autodiff graph.
    pub fn target_features(&self, high_res: Tensor<B, 4>) -> Result<Tensor<B::InnerBackend, 4>> {
        self.extractor.valid().extract(high_res.inner())
    }

    /// Weighted generator loss:
    /// `w_adv · BCE(D(G(x)), 1) + w_perc · MSE(F(G(x)), target) [+ w_pix · MSE(G(x), y)]`.
    pub fn generator_loss(
        &self,
        low_res: Tensor<B, 4>,
        high_res: Tensor<B, 4>,
        target_features: Tensor<B, 4>,
    ) -> Result<GeneratorLoss<B>> {
        let output = self.forward(low_res)?;
        if output.features.dims() != target_features.dims() {
            return Err(Error::ShapeMismatch {
                reference: target_features.dims().to_vec(),
                candidate: output.features.dims().to_vec(),
            });
        }

        let real = Tensor::ones(output.validity.shape(), &output.validity.device());
        let adversarial = binary_cross_entropy(output.validity, real);
        let perceptual = mean_squared_error(output.features, target_features);

        let mut total = adversarial
            .clone()
            .mul_scalar(self.weights.adversarial)
            .add(perceptual.clone().mul_scalar(self.weights.perceptual));
        if self.weights.pixel > 0.0 {
            let pixel = mean_squared_error(output.generated, high_res);
            total = total.add(pixel.mul_scalar(self.weights.pixel));
        }

        let record = LossRecord {
            combined: scalar_value(&total),
            adversarial: scalar_value(&adversarial),
            perceptual: scalar_value(&perceptual),
        };
        Ok(GeneratorLoss { total, record })
    }

    fn check_low_res(&self, low_res: &Tensor<B, 4>) -> Result<()> {
        let [_, channels, height, width] = low_res.dims();
        let side = self.extractor.input_size() / self.generator.upscale();
        if channels != 3 || height != side || width != side {
            return Err(Error::ShapeMismatch {
                reference: vec![3, side, side],
                candidate: vec![channels, height, width],
            });
        }
        Ok(())
    }
}
