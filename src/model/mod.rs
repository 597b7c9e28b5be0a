//! Networks.
//!
//! - `generator`: residual super-resolution network
//! - `discriminator`: patch discriminator
//! - `feature`: frozen VGG19 truncation for the perceptual loss
//! - `composite`: the three wired together for the generator's update

pub mod composite;
pub mod discriminator;
pub mod feature;
pub mod generator;
mod layers;

pub use composite::{AdversarialModel, CompositeOutput, GeneratorLoss, LossWeights};
pub use discriminator::Discriminator;
pub use feature::{FeatureExtractor, FEATURE_CHANNELS, FEATURE_STRIDE};
pub use generator::Generator;
