//! Qualitative samples: generated/real/input PNG triplets plus a PSNR line each.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use burn::prelude::*;
use image::RgbImage;

use super::dataset::ImagePairBatch;
use crate::core::color::planar_unit_to_rgb;
use crate::core::{psnr, Error, Result};
use crate::model::Generator;

pub const PSNR_FILE: &str = "psnr.txt";

/// Run `generator` on `batch` and write, for every pair `i`:
/// `{epoch}_gen{i}.png`, `{epoch}_highres{i}.png`, `{epoch}_lowres{i}.png`, and
/// `"{epoch} {i} {psnr}"` appended to `psnr.txt`.
///
/// PSNR is measured between the high-res and generated images after mapping both
/// to `[0, 1]`. Returns the PSNR of each pair.
pub fn write_samples<B: Backend>(
    generator: &Generator<B>,
    batch: ImagePairBatch<B>,
    dir: &Path,
    epoch: usize,
) -> Result<Vec<f64>> {
    std::fs::create_dir_all(dir)?;

    let generated = to_unit(generator.forward(batch.low_res.clone()));
    let high_res = to_unit(batch.high_res);
    let low_res = to_unit(batch.low_res);

    let mut psnr_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(PSNR_FILE))?;

    let mut scores = Vec::with_capacity(generated.dims()[0]);
    for i in 0..generated.dims()[0] {
        let gen_i = nth(&generated, i);
        let hr_i = nth(&high_res, i);
        let lr_i = nth(&low_res, i);

        let score = psnr(hr_i.clone(), gen_i.clone())?;
        writeln!(psnr_log, "{epoch} {i} {score:.4}")?;

        tensor_to_rgb(gen_i)?.save(dir.join(format!("{epoch}_gen{i}.png")))?;
        tensor_to_rgb(hr_i)?.save(dir.join(format!("{epoch}_highres{i}.png")))?;
        tensor_to_rgb(lr_i)?.save(dir.join(format!("{epoch}_lowres{i}.png")))?;
        scores.push(score);
    }
    Ok(scores)
}

/// `[-1, 1]` → `[0, 1]`.
fn to_unit<B: Backend>(images: Tensor<B, 4>) -> Tensor<B, 4> {
    images.mul_scalar(0.5).add_scalar(0.5)
}

fn nth<B: Backend>(images: &Tensor<B, 4>, index: usize) -> Tensor<B, 3> {
    images.clone().slice([index..index + 1]).squeeze::<3>(0)
}

/// `[3, H, W]` in `[0, 1]` → 8-bit image.
pub fn tensor_to_rgb<B: Backend>(image: Tensor<B, 3>) -> Result<RgbImage> {
    let [channels, height, width] = image.dims();
    if channels != 3 {
        return Err(Error::ShapeMismatch {
            reference: vec![3, height, width],
            candidate: vec![channels, height, width],
        });
    }
    let values = image
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::TensorData(format!("{e:?}")))?;
    planar_unit_to_rgb(&values, width as u32, height as u32)
        .ok_or_else(|| Error::TensorData(format!("expected {} values", 3 * width * height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModelConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_tensor_to_rgb_quantizes() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 3>::from_floats([[[0.0, 1.0]], [[0.5, 0.5]], [[1.0, 0.0]]], &device);
        let img = tensor_to_rgb(t).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0, 128, 255]);
    }

    #[test]
    fn test_write_samples_files() {
        let device = Default::default();
        let generator = ModelConfig::new()
            .with_upscale(2)
            .with_input_dim(8)
            .with_residual_blocks(1)
            .with_generator_filters(4)
            .with_upsample_filters(4)
            .init_generator::<TestBackend>(&device)
            .unwrap();
        let batch = ImagePairBatch::new(
            Tensor::zeros([2, 3, 16, 16], &device),
            Tensor::zeros([2, 3, 8, 8], &device),
            2,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let scores = write_samples(&generator, batch, dir.path(), 7).unwrap();
        assert_eq!(scores.len(), 2);

        for i in 0..2 {
            for kind in ["gen", "highres", "lowres"] {
                assert!(dir.path().join(format!("7_{kind}{i}.png")).is_file());
            }
        }
        let log = std::fs::read_to_string(dir.path().join(PSNR_FILE)).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("7 0 "));
        assert!(lines[1].starts_with("7 1 "));
    }
}
