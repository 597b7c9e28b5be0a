//! Loss functions and the per-step loss records.
//!
//! All losses reduce to a single-element tensor so they can be backpropagated
//! directly.

use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::core::DiscriminatorLoss;

/// Probabilities are clamped to `[EPS, 1 - EPS]` before taking logs.
const BCE_EPSILON: f64 = 1e-7;

/// Mean binary cross-entropy between probabilities and 0/1 targets.
pub fn binary_cross_entropy<B: Backend, const D: usize>(
    probabilities: Tensor<B, D>,
    targets: Tensor<B, D>,
) -> Tensor<B, 1> {
    let p = probabilities.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    let positive = targets.clone().mul(p.clone().log());
    let negative = targets.neg().add_scalar(1.0).mul(p.neg().add_scalar(1.0).log());
    positive.add(negative).neg().mean()
}

pub fn mean_squared_error<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
) -> Tensor<B, 1> {
    MseLoss::new().forward(predictions, targets, Reduction::Mean)
}

/// Discriminator objective against a constant patch target (1 = real, 0 = fake).
pub fn discriminator_loss<B: Backend>(
    validity: Tensor<B, 4>,
    target: f32,
    kind: DiscriminatorLoss,
) -> Tensor<B, 1> {
    let targets = Tensor::full(validity.shape(), target, &validity.device());
    match kind {
        DiscriminatorLoss::Mse => mean_squared_error(validity, targets),
        DiscriminatorLoss::Bce => binary_cross_entropy(validity, targets),
    }
}

/// Host-side value of a single-element loss.
pub fn scalar_value<B: Backend>(loss: &Tensor<B, 1>) -> f64 {
    loss.clone().into_scalar().elem::<f64>()
}

/// Generator losses of one step. `adversarial` and `perceptual` are unweighted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LossRecord {
    pub combined: f64,
    pub adversarial: f64,
    pub perceptual: f64,
}

impl LossRecord {
    pub fn is_finite(&self) -> bool {
        self.combined.is_finite() && self.adversarial.is_finite() && self.perceptual.is_finite()
    }

    /// `"combined adversarial perceptual"`, three decimals each.
    pub fn to_log_line(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            self.combined, self.adversarial, self.perceptual
        )
    }
}

/// Discriminator losses of one step: the real-batch update and the fake-batch update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiscriminatorLossRecord {
    pub real: f64,
    pub fake: f64,
}

impl DiscriminatorLossRecord {
    pub fn mean(&self) -> f64 {
        0.5 * (self.real + self.fake)
    }
}
