//! Super-resolution generator (SRResNet-style).
//!
//! ```text
//! low-res ─ conv9 ─ relu ─┬─ [residual block] × B ─ conv3 ─ bn ─(+)─ [up2 ─ conv3 ─ relu] × log2(s) ─ conv9 ─ tanh
//!                         └──────────────── long skip ────────────┘
//! ```

use burn::nn::conv::Conv2d;
use burn::nn::BatchNorm;
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};

use super::layers::{batch_norm, conv, Upsample2d};
use crate::core::{ConfigError, ModelConfig};

const CHANNELS: usize = 3;

/// conv3 → relu → bn → conv3 → bn, plus the block input.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn new(filters: usize, device: &B::Device) -> Self {
        Self {
            conv1: conv([filters, filters], 3, 1, device),
            bn1: batch_norm(filters, device),
            conv2: conv([filters, filters], 3, 1, device),
            bn2: batch_norm(filters, device),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv1.forward(input.clone()));
        let x = self.bn1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.bn2.forward(x);
        x.add(input)
    }
}

/// 2× nearest upsample → conv3 → relu.
#[derive(Module, Debug)]
pub struct UpsampleBlock<B: Backend> {
    upsample: Upsample2d,
    conv: Conv2d<B>,
}

impl<B: Backend> UpsampleBlock<B> {
    pub fn new(channels: [usize; 2], device: &B::Device) -> Self {
        Self {
            upsample: Upsample2d::new(2),
            conv: conv(channels, 3, 1, device),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.conv.forward(self.upsample.forward(input)))
    }
}

/// Maps `[N, 3, h, w]` in `[-1, 1]` to `[N, 3, h * upscale, w * upscale]` in `[-1, 1]`.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    entry: Conv2d<B>,
    blocks: Vec<ResidualBlock<B>>,
    bridge: Conv2d<B>,
    bridge_norm: BatchNorm<B, 2>,
    upsample: Vec<UpsampleBlock<B>>,
    exit: Conv2d<B>,
    upscale: usize,
}

impl<B: Backend> Generator<B> {
    pub fn forward(&self, low_res: Tensor<B, 4>) -> Tensor<B, 4> {
        let skip = relu(self.entry.forward(low_res));

        let mut x = skip.clone();
        for block in &self.blocks {
            x = block.forward(x);
        }

        let x = self.bridge_norm.forward(self.bridge.forward(x)).add(skip);
        let x = self.upsample.iter().fold(x, |x, stage| stage.forward(x));

        tanh(self.exit.forward(x))
    }

    pub fn upscale(&self) -> usize {
        self.upscale
    }

    pub fn residual_blocks(&self) -> usize {
        self.blocks.len()
    }
}

impl ModelConfig {
    /// Build the generator. Fails before allocating anything if the upscale factor
    /// is not a power of two.
    pub fn init_generator<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<Generator<B>, ConfigError> {
        self.validate()?;
        let stages = self.upsample_stages()?;
        let filters = self.generator_filters;

        let blocks = (0..self.residual_blocks)
            .map(|_| ResidualBlock::new(filters, device))
            .collect();

        let upsample = (0..stages)
            .map(|stage| {
                let in_channels = if stage == 0 {
                    filters
                } else {
                    self.upsample_filters
                };
                UpsampleBlock::new([in_channels, self.upsample_filters], device)
            })
            .collect();

        Ok(Generator {
            entry: conv([CHANNELS, filters], 9, 1, device),
            blocks,
            bridge: conv([filters, filters], 3, 1, device),
            bridge_norm: batch_norm(filters, device),
            upsample,
            exit: conv([self.upsample_filters, CHANNELS], 9, 1, device),
            upscale: self.upscale,
        })
    }
}
