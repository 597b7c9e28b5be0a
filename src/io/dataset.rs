//! Paired high-/low-resolution batches and where they come from.
//!
//! The trainer only talks to [`PairSource`]. Two sources ship with the crate:
//! - [`ImageFolderSource`]: random images from a directory, resized and flipped
//! - [`SyntheticSource`]: random tensors, low-res made by average pooling

use std::path::{Path, PathBuf};

use burn::nn::pool::AvgPool2dConfig;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Distribution;
use image::imageops::{self, FilterType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::color::rgb_to_planar_signed;
use crate::core::{Error, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Real high-res images and their low-res counterparts, both in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct ImagePairBatch<B: Backend> {
    pub high_res: Tensor<B, 4>,
    pub low_res: Tensor<B, 4>,
}

impl<B: Backend> ImagePairBatch<B> {
    /// Pair up two batches, checking that `high_res` is exactly `upscale` times
    /// `low_res` in both spatial dims.
    pub fn new(high_res: Tensor<B, 4>, low_res: Tensor<B, 4>, upscale: usize) -> Result<Self> {
        let [n_hr, c_hr, h_hr, w_hr] = high_res.dims();
        let [n_lr, c_lr, h_lr, w_lr] = low_res.dims();
        if n_hr != n_lr || c_hr != 3 || c_lr != 3 || h_hr != h_lr * upscale || w_hr != w_lr * upscale
        {
            return Err(Error::ShapeMismatch {
                reference: vec![n_lr, 3, h_lr * upscale, w_lr * upscale],
                candidate: vec![n_hr, c_hr, h_hr, w_hr],
            });
        }
        Ok(Self { high_res, low_res })
    }

    pub fn len(&self) -> usize {
        self.high_res.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B: AutodiffBackend> ImagePairBatch<B> {
    /// The same pairs on the inner backend, detached from any graph.
    pub fn inner(self) -> ImagePairBatch<B::InnerBackend> {
        ImagePairBatch {
            high_res: self.high_res.inner(),
            low_res: self.low_res.inner(),
        }
    }
}

/// Supplies training and test pairs.
pub trait PairSource<B: Backend> {
    /// `batch_size` pairs whose high-res side is `upscale` times the low-res side.
    /// Test batches skip augmentation.
    fn load_batch(
        &mut self,
        batch_size: usize,
        upscale: usize,
        is_testing: bool,
    ) -> Result<ImagePairBatch<B>>;
}

/// Images sampled (with replacement) from a directory.
pub struct ImageFolderSource<B: Backend> {
    paths: Vec<PathBuf>,
    high_res_dim: u32,
    rng: StdRng,
    device: B::Device,
}

impl<B: Backend> ImageFolderSource<B> {
    pub fn new(dir: &Path, high_res_dim: usize, seed: u64, device: &B::Device) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(Error::Dataset(format!(
                "no png/jpg images in {}",
                dir.display()
            )));
        }
        paths.sort();

        let high_res_dim = u32::try_from(high_res_dim)
            .map_err(|_| Error::Dataset(format!("image size {high_res_dim} is too large")))?;

        Ok(Self {
            paths,
            high_res_dim,
            rng: StdRng::seed_from_u64(seed),
            device: device.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn to_tensor(&self, pixels: Vec<f32>, batch: usize, side: u32) -> Tensor<B, 4> {
        let side = side as usize;
        Tensor::from_data(TensorData::new(pixels, [batch, 3, side, side]), &self.device)
    }
}

impl<B: Backend> PairSource<B> for ImageFolderSource<B> {
    fn load_batch(
        &mut self,
        batch_size: usize,
        upscale: usize,
        is_testing: bool,
    ) -> Result<ImagePairBatch<B>> {
        let hr_dim = self.high_res_dim;
        let factor = upscale as u32;
        if factor == 0 || hr_dim % factor != 0 {
            return Err(Error::Dataset(format!(
                "image size {hr_dim} is not divisible by upscale {upscale}"
            )));
        }
        let lr_dim = hr_dim / factor;

        let mut high_res = Vec::with_capacity(batch_size * 3 * (hr_dim * hr_dim) as usize);
        let mut low_res = Vec::with_capacity(batch_size * 3 * (lr_dim * lr_dim) as usize);
        for _ in 0..batch_size {
            let path = &self.paths[self.rng.random_range(0..self.paths.len())];
            let image = image::open(path)?.to_rgb8();

            let mut hr = imageops::resize(&image, hr_dim, hr_dim, FilterType::CatmullRom);
            let mut lr = imageops::resize(&image, lr_dim, lr_dim, FilterType::CatmullRom);
            if !is_testing && self.rng.random::<f64>() < 0.5 {
                imageops::flip_horizontal_in_place(&mut hr);
                imageops::flip_horizontal_in_place(&mut lr);
            }

            high_res.extend(rgb_to_planar_signed(&hr));
            low_res.extend(rgb_to_planar_signed(&lr));
        }

        ImagePairBatch::new(
            self.to_tensor(high_res, batch_size, hr_dim),
            self.to_tensor(low_res, batch_size, lr_dim),
            upscale,
        )
    }
}

/// Uniform noise in `[-1, 1]` as high-res images; low-res is their box-filtered
/// downsample. Uses the backend's RNG, so [`Backend::seed`] makes it repeatable.
pub struct SyntheticSource<B: Backend> {
    high_res_dim: usize,
    device: B::Device,
}

impl<B: Backend> SyntheticSource<B> {
    pub fn new(high_res_dim: usize, device: &B::Device) -> Self {
        Self {
            high_res_dim,
            device: device.clone(),
        }
    }
}

impl<B: Backend> PairSource<B> for SyntheticSource<B> {
    fn load_batch(
        &mut self,
        batch_size: usize,
        upscale: usize,
        _is_testing: bool,
    ) -> Result<ImagePairBatch<B>> {
        if upscale == 0 || self.high_res_dim % upscale != 0 {
            return Err(Error::Dataset(format!(
                "image size {} is not divisible by upscale {upscale}",
                self.high_res_dim
            )));
        }
        let side = self.high_res_dim;
        let high_res = Tensor::<B, 4>::random(
            [batch_size, 3, side, side],
            Distribution::Uniform(-1.0, 1.0),
            &self.device,
        );
        let low_res = AvgPool2dConfig::new([upscale, upscale])
            .with_strides([upscale, upscale])
            .init()
            .forward(high_res.clone());
        ImagePairBatch::new(high_res, low_res, upscale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[test]
    fn test_batch_rejects_mismatched_sides() {
        let device = Default::default();
        let hr = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let lr = Tensor::<TestBackend, 4>::zeros([2, 3, 8, 8], &device);
        assert!(ImagePairBatch::new(hr.clone(), lr.clone(), 4).is_ok());
        assert!(matches!(
            ImagePairBatch::new(hr, lr, 2),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_synthetic_source_shapes_and_range() {
        let device = Default::default();
        let mut source = SyntheticSource::<TestBackend>::new(32, &device);
        let batch = source.load_batch(2, 4, false).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.high_res.dims(), [2, 3, 32, 32]);
        assert_eq!(batch.low_res.dims(), [2, 3, 8, 8]);
        let values = batch.low_res.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_image_folder_source() {
        let dir = tempfile::tempdir().unwrap();
        for (i, shade) in [0u8, 255].iter().enumerate() {
            let img = RgbImage::from_pixel(40, 40, Rgb([*shade, *shade, *shade]));
            img.save(dir.path().join(format!("img{i}.png"))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let device = Default::default();
        let mut source = ImageFolderSource::<TestBackend>::new(dir.path(), 16, 7, &device).unwrap();
        assert_eq!(source.len(), 2);

        let batch = source.load_batch(3, 4, true).unwrap();
        assert_eq!(batch.high_res.dims(), [3, 3, 16, 16]);
        assert_eq!(batch.low_res.dims(), [3, 3, 4, 4]);
        // Flat images stay flat: every value is -1 or 1.
        let values = batch.high_res.into_data().to_vec::<f32>().unwrap();
        assert!(values
            .iter()
            .all(|v| (v + 1.0).abs() < 1e-5 || (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let result = ImageFolderSource::<TestBackend>::new(dir.path(), 16, 0, &device);
        assert!(matches!(result, Err(Error::Dataset(_))));
    }
}
