//! Image fidelity metrics (reporting only, never a training signal).

use burn::prelude::*;
use burn::tensor::ElementConversion;

use super::error::{Error, Result};

/// Peak signal-to-noise ratio between two images or batches, in dB.
///
/// Computes `-10 * log10(mean((candidate - reference)^2))` over all elements, so
/// the peak value is implicitly 1 and inputs are expected in `[0, 1]`.
/// Identical inputs give `+inf`. The metric only depends on the squared
/// difference and is therefore symmetric.
///
/// Shapes must match exactly; nothing is broadcast.
pub fn psnr<B: Backend, const D: usize>(
    reference: Tensor<B, D>,
    candidate: Tensor<B, D>,
) -> Result<f64> {
    let reference_dims = reference.dims();
    let candidate_dims = candidate.dims();
    if reference_dims != candidate_dims {
        return Err(Error::ShapeMismatch {
            reference: reference_dims.to_vec(),
            candidate: candidate_dims.to_vec(),
        });
    }

    let mse: f64 = candidate
        .sub(reference)
        .powf_scalar(2.0)
        .mean()
        .into_scalar()
        .elem();
    Ok(-10.0 * mse.log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_psnr_of_identical_images_is_infinite() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::random([3, 8, 8], Distribution::Uniform(0.0, 1.0), &device);
        let value = psnr(x.clone(), x).unwrap();
        assert!(value.is_infinite() && value > 0.0);
    }

    #[test]
    fn test_psnr_is_symmetric() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::random([2, 3, 4, 4], Distribution::Uniform(0.0, 1.0), &device);
        let y = Tensor::<TestBackend, 4>::random([2, 3, 4, 4], Distribution::Uniform(0.0, 1.0), &device);
        let xy = psnr(x.clone(), y.clone()).unwrap();
        let yx = psnr(y, x).unwrap();
        assert_relative_eq!(xy, yx, epsilon = 1e-9);
    }

    #[test]
    fn test_psnr_matches_hand_computed_value() {
        let device = Default::default();
        let reference = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0, 0.0, 0.0], &device);
        // Squared error 0.01 everywhere -> mse = 0.01 -> 20 dB.
        let candidate = Tensor::<TestBackend, 1>::from_floats([0.1, -0.1, 0.1, -0.1], &device);
        let value = psnr(reference, candidate).unwrap();
        assert_relative_eq!(value, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_psnr_rejects_mismatched_shapes() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 3>::zeros([3, 8, 8], &device);
        let b = Tensor::<TestBackend, 3>::zeros([3, 8, 4], &device);
        match psnr(a, b) {
            Err(Error::ShapeMismatch {
                reference,
                candidate,
            }) => {
                assert_eq!(reference, vec![3, 8, 8]);
                assert_eq!(candidate, vec![3, 8, 4]);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }
}
