//! Building blocks shared by the three networks.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig2d};
use burn::prelude::*;

/// Slope of every leaky ReLU in the discriminator.
pub const LEAKY_SLOPE: f64 = 0.2;

/// Burn's momentum weights the *new* batch statistic, so this matches a moving
/// average that keeps 0.8 of the old value.
const NORM_MOMENTUM: f64 = 0.2;
const NORM_EPSILON: f64 = 1e-3;

/// Square convolution with "same" padding for odd kernels.
///
/// With stride 2 the output side is `ceil(input / 2)`, i.e. exactly half for even
/// inputs.
pub fn conv<B: Backend>(
    channels: [usize; 2],
    kernel: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    let pad = kernel / 2;
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(pad, pad))
        .init(device)
}

pub fn batch_norm<B: Backend>(channels: usize, device: &B::Device) -> BatchNorm<B, 2> {
    BatchNormConfig::new(channels)
        .with_momentum(NORM_MOMENTUM)
        .with_epsilon(NORM_EPSILON)
        .init(device)
}

/// Batch norm in training mode that leaves the running statistics alone.
///
/// The input is normalised with its own per-channel mean and (biased) variance,
/// exactly like [`BatchNorm::forward`] on an autodiff backend, and gradients flow
/// through those statistics. `running_mean` and `running_var` are never read or
/// written.
pub fn frozen_batch_norm<B: Backend>(norm: &BatchNorm<B, 2>, input: Tensor<B, 4>) -> Tensor<B, 4> {
    let [batch, channels, height, width] = input.dims();
    let shape = [1, channels, 1, 1];

    // [N, C, H, W] -> [C, N * H * W]
    let flat = input
        .clone()
        .swap_dims(0, 1)
        .reshape([channels, batch * height * width]);
    let mean = flat.clone().mean_dim(1);
    let var = flat.sub(mean.clone()).powi_scalar(2).mean_dim(1);

    let gamma = norm.gamma.val().reshape(shape);
    let beta = norm.beta.val().reshape(shape);

    input
        .sub(mean.reshape(shape))
        .div(var.reshape(shape).add_scalar(norm.epsilon).sqrt())
        .mul(gamma)
        .add(beta)
}

/// Nearest-neighbour spatial upsampling by an integer factor.
#[derive(Module, Debug, Clone)]
pub struct Upsample2d {
    scale_factor: usize,
}

impl Upsample2d {
    pub fn new(scale_factor: usize) -> Self {
        Self { scale_factor }
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, height, width] = x.dims();
        let s = self.scale_factor;

        // [B, C, H, W] -> [B, C, H, 1, W, 1] -> repeat -> [B, C, H*s, W*s]
        x.reshape([batch, channels, height, 1, width, 1])
            .repeat(&[1, 1, 1, s, 1, s])
            .reshape([batch, channels, height * s, width * s])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_upsample_repeats_each_pixel() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::from_floats([[[[1.0, 2.0], [3.0, 4.0]]]], &device);
        let up = Upsample2d::new(2).forward(x);
        assert_eq!(up.dims(), [1, 1, 4, 4]);

        let values = up.into_data().to_vec::<f32>().unwrap();
        #[rustfmt::skip]
        let expected = vec![
            1.0, 1.0, 2.0, 2.0,
            1.0, 1.0, 2.0, 2.0,
            3.0, 3.0, 4.0, 4.0,
            3.0, 3.0, 4.0, 4.0,
        ];
        assert_eq!(values, expected);
    }

    #[test]
    fn test_conv_stride_two_halves_even_inputs() {
        let device = Default::default();
        let layer = conv::<TestBackend>([3, 4], 3, 2, &device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);
        assert_eq!(layer.forward(x).dims(), [1, 4, 8, 8]);

        let wide = conv::<TestBackend>([3, 4], 9, 1, &device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 10, 10], &device);
        assert_eq!(wide.forward(x).dims(), [1, 4, 10, 10]);
    }

    #[test]
    fn test_frozen_batch_norm_uses_batch_statistics() {
        // Channel 0 holds {1, 3}, channel 1 holds {-2, -2}.
        let device = Default::default();
        let norm = batch_norm::<TestBackend>(2, &device);
        let x = Tensor::<TestBackend, 4>::from_floats(
            [[[[1.0]], [[-2.0]]], [[[3.0]], [[-2.0]]]],
            &device,
        );
        let y = frozen_batch_norm(&norm, x);
        let scale = 1.0 / (1.0f32 + 1e-3).sqrt();
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] + scale).abs() < 1e-5, "{values:?}");
        assert!(values[1].abs() < 1e-5, "{values:?}");
        assert!((values[2] - scale).abs() < 1e-5, "{values:?}");
        assert!(values[3].abs() < 1e-5, "{values:?}");
    }

    #[test]
    fn test_frozen_batch_norm_leaves_running_statistics() {
        let device = Default::default();
        let norm = batch_norm::<TestBackend>(2, &device);
        let x = Tensor::<TestBackend, 4>::ones([2, 2, 3, 3], &device).mul_scalar(5.0);
        let _ = frozen_batch_norm(&norm, x);

        let mean = norm.running_mean.value().into_data().to_vec::<f32>().unwrap();
        let var = norm.running_var.value().into_data().to_vec::<f32>().unwrap();
        assert_eq!(mean, vec![0.0, 0.0]);
        assert_eq!(var, vec![1.0, 1.0]);
    }
}
