//! The single optimizer-step entry point.
//!
//! Which network a loss updates is an explicit argument: the step extracts
//! gradients for exactly that module and hands them to its optimizer. Every
//! other parameter touched by the backward pass is left alone.

use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::model::{AdversarialModel, Discriminator, Generator};

/// Network updated by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trainable {
    Generator,
    Discriminator,
}

/// One Adam optimizer per trainable network, sharing a learning rate.
pub struct GanOptimizers<OG, OD> {
    generator: OG,
    discriminator: OD,
    learning_rate: f64,
}

impl<OG, OD> GanOptimizers<OG, OD> {
    pub fn new(generator: OG, discriminator: OD, learning_rate: f64) -> Self {
        Self {
            generator,
            discriminator,
            learning_rate,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Backpropagate `loss` and update `trainable` only.
    pub fn step<B>(
        &mut self,
        mut model: AdversarialModel<B>,
        trainable: Trainable,
        loss: Tensor<B, 1>,
    ) -> AdversarialModel<B>
    where
        B: AutodiffBackend,
        OG: Optimizer<Generator<B>, B>,
        OD: Optimizer<Discriminator<B>, B>,
    {
        let grads = loss.backward();
        match trainable {
            Trainable::Generator => {
                let grads = GradientsParams::from_grads(grads, &model.generator);
                model.generator = self
                    .generator
                    .step(self.learning_rate, model.generator, grads);
            }
            Trainable::Discriminator => {
                let grads = GradientsParams::from_grads(grads, &model.discriminator);
                model.discriminator =
                    self.discriminator
                        .step(self.learning_rate, model.discriminator, grads);
            }
        }
        model
    }
}

fn adam() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-7)
}

/// Adam for both networks (β₁ 0.9, β₂ 0.999, ε 1e-7).
pub fn adam_optimizers<B: AutodiffBackend>(
    learning_rate: f64,
) -> GanOptimizers<impl Optimizer<Generator<B>, B>, impl Optimizer<Discriminator<B>, B>> {
    GanOptimizers::new(
        adam().init::<B, Generator<B>>(),
        adam().init::<B, Discriminator<B>>(),
        learning_rate,
    )
}

/// Adam for the generator alone, used by pretraining.
pub fn generator_adam<B: AutodiffBackend>() -> impl Optimizer<Generator<B>, B> {
    adam().init::<B, Generator<B>>()
}
