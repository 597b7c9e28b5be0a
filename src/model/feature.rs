//! Frozen VGG19 feature extractor for the perceptual loss.
//!
//! Keeps the first three convolutional blocks of VGG19 and exposes the
//! activation after `block3_conv3`:
//!
//! - block1: conv3-64 ×2, maxpool
//! - block2: conv3-128 ×2, maxpool
//! - block3: conv3-256 ×3 (output)
//!
//! Output is `[N, 256, H / 4, W / 4]`. Parameters never receive gradients and are
//! never handed to an optimizer.

use std::path::Path;

use burn::nn::conv::Conv2d;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use super::layers::conv;
use crate::core::{Error, Result};
use crate::io::checkpoint::load_module;

/// ImageNet channel statistics the pretrained weights expect (inputs in `[0, 1]`).
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Channels of the extracted feature map.
pub const FEATURE_CHANNELS: usize = 256;
/// Spatial stride of the extracted feature map.
pub const FEATURE_STRIDE: usize = 4;

#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    // Block 1
    conv1_1: Conv2d<B>,
    conv1_2: Conv2d<B>,
    // Block 2
    conv2_1: Conv2d<B>,
    conv2_2: Conv2d<B>,
    // Block 3
    conv3_1: Conv2d<B>,
    conv3_2: Conv2d<B>,
    conv3_3: Conv2d<B>,
    pool: MaxPool2d,
    input_size: usize,
}

impl<B: Backend> FeatureExtractor<B> {
    /// Randomly initialised extractor for square inputs of side `input_size`.
    pub fn new(input_size: usize, device: &B::Device) -> Self {
        Self {
            conv1_1: conv([3, 64], 3, 1, device),
            conv1_2: conv([64, 64], 3, 1, device),
            conv2_1: conv([64, 128], 3, 1, device),
            conv2_2: conv([128, 128], 3, 1, device),
            conv3_1: conv([128, 256], 3, 1, device),
            conv3_2: conv([256, 256], 3, 1, device),
            conv3_3: conv([256, FEATURE_CHANNELS], 3, 1, device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            input_size,
        }
        .no_grad()
    }

    /// Extractor with pretrained weights read from a burn record file.
    pub fn pretrained(input_size: usize, path: &Path, device: &B::Device) -> Result<Self> {
        let extractor = load_module(Self::new(input_size, device), path, device)?;
        Ok(extractor.no_grad())
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Features of a batch of `[-1, 1]` images.
    ///
    /// Fails if the batch is not `[N, 3, input_size, input_size]`.
    pub fn extract(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let [_, channels, height, width] = images.dims();
        if channels != 3 || height != self.input_size || width != self.input_size {
            return Err(Error::ShapeMismatch {
                reference: vec![3, self.input_size, self.input_size],
                candidate: vec![channels, height, width],
            });
        }
        Ok(self.forward(images))
    }

    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.normalize(images);

        // Block 1
        let x = relu(self.conv1_1.forward(x));
        let x = relu(self.conv1_2.forward(x));
        let x = self.pool.forward(x);

        // Block 2
        let x = relu(self.conv2_1.forward(x));
        let x = relu(self.conv2_2.forward(x));
        let x = self.pool.forward(x);

        // Block 3
        let x = relu(self.conv3_1.forward(x));
        let x = relu(self.conv3_2.forward(x));
        relu(self.conv3_3.forward(x))
    }

    /// `[-1, 1]` → `[0, 1]` → ImageNet-standardised.
    fn normalize(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = images.device();
        let mean = Tensor::<B, 1>::from_floats(IMAGENET_MEAN, &device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(IMAGENET_STD, &device).reshape([1, 3, 1, 1]);
        images.mul_scalar(0.5).add_scalar(0.5).sub(mean).div(std)
    }
}
