//! Generator warm-up before adversarial training (SRResNet).
//!
//! `PretrainMode::Pretrain` fits the generator alone to pixel MSE on a fixed
//! pool of pairs, saves it as `srresnet.mpk`, and writes samples.
//! `PretrainMode::LoadPretrained` restores that file instead.

use std::path::Path;
use std::time::Instant;

use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use super::loss::{mean_squared_error, scalar_value};
use super::step::generator_adam;
use super::trainer::sample_images;
use crate::core::{PretrainMode, Result, TrainingConfig};
use crate::io::checkpoint::{load_generator, save_generator, PRETRAINED_FILE};
use crate::io::PairSource;
use crate::model::Generator;

/// Epoch label of the samples written after pretraining.
pub const PRETRAIN_SAMPLE_EPOCH: usize = 5;

/// Apply the configured [`PretrainMode`] to a freshly built generator.
///
/// `checkpoint_dir` holds `srresnet.mpk`; samples go to `output_dir`. The
/// pretrained generator is saved before samples are written, and a sample
/// failure is only logged.
pub fn prepare_generator<B, S>(
    config: &TrainingConfig,
    generator: Generator<B>,
    source: &mut S,
    output_dir: &Path,
    checkpoint_dir: &Path,
    device: &B::Device,
) -> Result<Generator<B>>
where
    B: AutodiffBackend,
    S: PairSource<B>,
{
    let stem = checkpoint_dir.join(PRETRAINED_FILE);
    match config.pretrain {
        PretrainMode::Off => Ok(generator),
        PretrainMode::LoadPretrained => {
            let generator = load_generator(generator, &stem, device)?;
            info!(path = %stem.display(), "loaded pretrained generator");
            Ok(generator)
        }
        PretrainMode::Pretrain => {
            let generator = pretrain_generator(config, generator, source, device)?;
            save_generator(&generator, &stem)?;
            info!(path = %stem.display(), "saved pretrained generator");

            if let Err(e) = sample_images(
                &generator,
                source,
                config.sample_count,
                config.model.upscale,
                output_dir,
                PRETRAIN_SAMPLE_EPOCH,
            ) {
                warn!(error = %e, "failed to write pretraining samples");
            }
            Ok(generator)
        }
    }
}

/// Mini-batch pixel-MSE training over one pool of `pretrain_images` pairs,
/// reshuffled every epoch.
pub fn pretrain_generator<B, S>(
    config: &TrainingConfig,
    mut generator: Generator<B>,
    source: &mut S,
    device: &B::Device,
) -> Result<Generator<B>>
where
    B: AutodiffBackend,
    S: PairSource<B>,
{
    let pool = source.load_batch(config.pretrain_images, config.model.upscale, false)?;
    let mut optimizer = generator_adam::<B>();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..pool.len()).collect();
    let start = Instant::now();

    info!(
        images = pool.len(),
        epochs = config.pretrain_epochs,
        batch_size = config.pretrain_batch_size,
        "pretraining generator"
    );

    for epoch in 0..config.pretrain_epochs {
        order.shuffle(&mut rng);
        let mut total = 0.0;
        let mut batches = 0usize;
        for chunk in order.chunks(config.pretrain_batch_size) {
            let indices: Vec<i64> = chunk.iter().map(|&i| i as i64).collect();
            let indices =
                Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [chunk.len()]), device);
            let low_res = pool.low_res.clone().select(0, indices.clone());
            let high_res = pool.high_res.clone().select(0, indices);

            let loss = mean_squared_error(generator.forward(low_res), high_res);
            total += scalar_value(&loss);
            batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &generator);
            generator = optimizer.step(config.learning_rate, generator, grads);
        }
        info!(
            epoch,
            elapsed = ?start.elapsed(),
            loss = total / batches.max(1) as f64,
            "pretrain"
        );
    }
    Ok(generator)
}
