//! Patch discriminator.
//!
//! Eight conv3 blocks (filters f, f, 2f, 2f, 4f, 4f, 8f, 8f; strides alternating
//! 1/2) followed by two dense layers applied at every spatial location. The
//! output keeps its spatial layout: one realism probability per patch of
//! 16×16 input pixels rather than one verdict per image.

use burn::nn::conv::Conv2d;
use burn::nn::{BatchNorm, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{leaky_relu, sigmoid};

use super::layers::{batch_norm, conv, frozen_batch_norm, LEAKY_SLOPE};
use crate::core::{ConfigError, ModelConfig};

const BLOCKS: usize = 8;

/// conv3 → leaky relu → optional batch norm.
#[derive(Module, Debug)]
pub struct DiscBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: Option<BatchNorm<B, 2>>,
}

impl<B: Backend> DiscBlock<B> {
    pub fn new(channels: [usize; 2], stride: usize, normalize: bool, device: &B::Device) -> Self {
        Self {
            conv: conv(channels, 3, stride, device),
            norm: normalize.then(|| batch_norm(channels[1], device)),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = leaky_relu(self.conv.forward(input), LEAKY_SLOPE);
        match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        }
    }

    fn forward_frozen(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = leaky_relu(self.conv.forward(input), LEAKY_SLOPE);
        match &self.norm {
            Some(norm) => frozen_batch_norm(norm, x),
            None => x,
        }
    }
}

#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    blocks: Vec<DiscBlock<B>>,
    dense: Linear<B>,
    out: Linear<B>,
}

impl<B: Backend> Discriminator<B> {
    /// `[N, 3, H, W]` → `[N, 1, H / 16, W / 16]` probabilities in `(0, 1)`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let features = self
            .blocks
            .iter()
            .fold(images, |x, block| block.forward(x));
        self.head(features)
    }

    /// Same graph as [`forward`](Self::forward) in training mode: batch norms
    /// normalise with the current batch's statistics, but the running statistics
    /// are not updated.
    ///
    /// This is how the discriminator takes part in the generator's update: it
    /// judges fakes under the normalisation it is trained with, produces
    /// gradients w.r.t. its input, and none of its state moves.
    pub fn forward_frozen(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let features = self
            .blocks
            .iter()
            .fold(images, |x, block| block.forward_frozen(x));
        self.head(features)
    }

    /// Dense layers over the channel axis at every grid cell.
    fn head(&self, features: Tensor<B, 4>) -> Tensor<B, 4> {
        // [N, C, h, w] -> [N, h, w, C]
        let x = features.swap_dims(1, 3).swap_dims(1, 2);
        let x = leaky_relu(self.dense.forward(x), LEAKY_SLOPE);
        let x = sigmoid(self.out.forward(x));
        // [N, h, w, 1] -> [N, 1, h, w]
        x.swap_dims(1, 3).swap_dims(2, 3)
    }
}

impl ModelConfig {
    pub fn init_discriminator<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<Discriminator<B>, ConfigError> {
        self.validate()?;
        let base = self.discriminator_filters;

        let mut blocks = Vec::with_capacity(BLOCKS);
        let mut in_channels = 3;
        for i in 0..BLOCKS {
            let filters = base << (i / 2);
            let stride = if i % 2 == 0 { 1 } else { 2 };
            blocks.push(DiscBlock::new([in_channels, filters], stride, i > 0, device));
            in_channels = filters;
        }

        let dense_width = base * 16;
        Ok(Discriminator {
            blocks,
            dense: LinearConfig::new(in_channels, dense_width).init(device),
            out: LinearConfig::new(dense_width, 1).init(device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_filter_progression() {
        let device = Default::default();
        let cfg = ModelConfig::new().with_upscale(2).with_input_dim(16);
        let disc = cfg.init_discriminator::<TestBackend>(&device).unwrap();
        assert_eq!(disc.blocks.len(), 8);
        assert!(disc.blocks[0].norm.is_none());
        assert!(disc.blocks[1..].iter().all(|b| b.norm.is_some()));
    }

    #[test]
    fn test_frozen_forward_matches_training_forward_without_moving_state() {
        use burn::backend::Autodiff;
        use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};

        type TrainBackend = Autodiff<NdArray>;
        let snapshot = |disc: &Discriminator<TrainBackend>| {
            BinBytesRecorder::<FullPrecisionSettings>::default()
                .record(disc.clone().into_record(), ())
                .unwrap()
        };

        let device = Default::default();
        let cfg = ModelConfig::new().with_upscale(2).with_input_dim(16);
        let disc = cfg.init_discriminator::<TrainBackend>(&device).unwrap();
        let x = Tensor::<TrainBackend, 4>::random(
            [2, 3, 32, 32],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );

        let before = snapshot(&disc);
        let frozen = disc.forward_frozen(x.clone()).into_data().to_vec::<f32>().unwrap();
        assert_eq!(snapshot(&disc), before);

        // Training-mode forward normalises with the same batch statistics.
        let trained = disc.forward(x).into_data().to_vec::<f32>().unwrap();
        for (a, b) in frozen.iter().zip(trained.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
        assert_ne!(snapshot(&disc), before);
    }
}
