//! Generator pretraining modes and checkpoint files.

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::prelude::*;
use srgan_rs::core::{Error, ModelConfig, PretrainMode, TrainingConfig};
use srgan_rs::io::checkpoint::{load_generator, save_generator, save_module, PRETRAINED_FILE};
use srgan_rs::io::SyntheticSource;
use srgan_rs::optim::pretrain::{prepare_generator, PRETRAIN_SAMPLE_EPOCH};

type TestBackend = Autodiff<NdArray>;

fn tiny() -> ModelConfig {
    ModelConfig::new()
        .with_upscale(2)
        .with_input_dim(8)
        .with_residual_blocks(1)
        .with_generator_filters(8)
        .with_upsample_filters(8)
        .with_discriminator_filters(4)
}

fn config(out: &Path, mode: PretrainMode) -> TrainingConfig {
    TrainingConfig::new(tiny(), "unused".into(), out.to_string_lossy().into_owned())
        .with_pretrain(mode)
        .with_pretrain_images(4)
        .with_pretrain_epochs(2)
        .with_pretrain_batch_size(3)
        .with_sample_count(2)
}

fn outputs<B: Backend>(generator: &srgan_rs::model::Generator<B>, device: &B::Device) -> Vec<f32> {
    let x = Tensor::<B, 4>::ones([1, 3, 8, 8], device).mul_scalar(0.25);
    generator
        .forward(x)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .unwrap()
}

#[test]
fn test_pretrain_saves_srresnet_and_samples_then_load_restores_it() {
    let out = tempfile::tempdir().unwrap();
    let device = Default::default();
    let mut source = SyntheticSource::<TestBackend>::new(16, &device);

    let cfg = config(out.path(), PretrainMode::Pretrain);
    let fresh = tiny().init_generator::<TestBackend>(&device).unwrap();
    let pretrained =
        prepare_generator(&cfg, fresh, &mut source, out.path(), out.path(), &device).unwrap();

    assert!(out.path().join(format!("{PRETRAINED_FILE}.mpk")).is_file());
    for i in 0..2 {
        let name = format!("{PRETRAIN_SAMPLE_EPOCH}_gen{i}.png");
        assert!(out.path().join(name).is_file());
    }

    let cfg = config(out.path(), PretrainMode::LoadPretrained);
    let other = tiny().init_generator::<TestBackend>(&device).unwrap();
    let loaded =
        prepare_generator(&cfg, other, &mut source, out.path(), out.path(), &device).unwrap();

    // Stored at half precision.
    let expected = outputs(&pretrained.valid(), &device);
    let actual = outputs(&loaded.valid(), &device);
    for (a, b) in expected.iter().zip(actual.iter()) {
        assert!((a - b).abs() < 5e-2, "{a} vs {b}");
    }
}

#[test]
fn test_load_pretrained_without_file_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let device = Default::default();
    let mut source = SyntheticSource::<TestBackend>::new(16, &device);
    let cfg = config(out.path(), PretrainMode::LoadPretrained);
    let generator = tiny().init_generator::<TestBackend>(&device).unwrap();

    let result = prepare_generator(&cfg, generator, &mut source, out.path(), out.path(), &device);
    assert!(matches!(result, Err(Error::MissingCheckpoint(_))));
}

#[test]
fn test_pretrained_generator_is_saved_even_if_samples_fail() {
    let out = tempfile::tempdir().unwrap();
    let device = Default::default();
    let mut source = SyntheticSource::<TestBackend>::new(16, &device);

    // A regular file where the sample directory should be.
    let samples = out.path().join("samples");
    std::fs::write(&samples, b"not a directory").unwrap();
    let checkpoints = out.path().join("checkpoints");
    std::fs::create_dir_all(&checkpoints).unwrap();

    let cfg = config(out.path(), PretrainMode::Pretrain);
    let generator = tiny().init_generator::<TestBackend>(&device).unwrap();
    let result = prepare_generator(&cfg, generator, &mut source, &samples, &checkpoints, &device);

    assert!(result.is_ok());
    assert!(checkpoints.join(format!("{PRETRAINED_FILE}.mpk")).is_file());
}

#[test]
fn test_generator_checkpoint_reload_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let device = Default::default();
    let stem = dir.path().join("generator_model");

    let original = tiny().init_generator::<NdArray>(&device).unwrap();
    save_generator(&original, &stem).unwrap();
    let first = load_generator(tiny().init_generator::<NdArray>(&device).unwrap(), &stem, &device)
        .unwrap();

    save_generator(&first, &stem).unwrap();
    let second = load_generator(tiny().init_generator::<NdArray>(&device).unwrap(), &stem, &device)
        .unwrap();

    assert_eq!(outputs(&first, &device), outputs(&second, &device));
}

#[test]
fn test_loading_a_discriminator_record_as_generator_fails() {
    let dir = tempfile::tempdir().unwrap();
    let device = Default::default();
    let stem = dir.path().join("model_ckpt_0_discriminator");

    let discriminator = tiny().init_discriminator::<NdArray>(&device).unwrap();
    save_module(&discriminator, &stem).unwrap();

    let generator = tiny().init_generator::<NdArray>(&device).unwrap();
    let result = load_generator(generator, &stem, &device);
    assert!(matches!(result, Err(Error::Checkpoint { .. })));
}

/// Save a generator built from `saved`, then load it into one built from `current`.
fn load_across(saved: ModelConfig, current: ModelConfig) -> Result<(), Error> {
    let dir = tempfile::tempdir().unwrap();
    let device = Default::default();
    let stem = dir.path().join(PRETRAINED_FILE);

    let generator = saved.init_generator::<NdArray>(&device).unwrap();
    save_generator(&generator, &stem).unwrap();

    let target = current.init_generator::<NdArray>(&device).unwrap();
    load_generator(target, &stem, &device).map(|_| ())
}

#[test]
fn test_loading_generator_with_other_residual_block_count_fails() {
    let result = load_across(tiny(), tiny().with_residual_blocks(2));
    assert!(matches!(result, Err(Error::Checkpoint { .. })), "{result:?}");
}

#[test]
fn test_loading_generator_with_other_upscale_fails() {
    let result = load_across(tiny(), tiny().with_upscale(4));
    assert!(matches!(result, Err(Error::Checkpoint { .. })), "{result:?}");
}

#[test]
fn test_loading_generator_with_other_filter_width_fails() {
    let result = load_across(tiny(), tiny().with_generator_filters(16));
    assert!(matches!(result, Err(Error::Checkpoint { .. })), "{result:?}");
}

#[test]
fn test_load_pretrained_with_incompatible_record_is_an_error() {
    let out = tempfile::tempdir().unwrap();
    let device = Default::default();
    let mut source = SyntheticSource::<TestBackend>::new(16, &device);

    let saved = tiny().with_residual_blocks(2).init_generator::<NdArray>(&device).unwrap();
    save_generator(&saved, &out.path().join(PRETRAINED_FILE)).unwrap();

    let cfg = config(out.path(), PretrainMode::LoadPretrained);
    let generator = tiny().init_generator::<TestBackend>(&device).unwrap();
    let result = prepare_generator(&cfg, generator, &mut source, out.path(), out.path(), &device);
    assert!(matches!(result, Err(Error::Checkpoint { .. })));
}
