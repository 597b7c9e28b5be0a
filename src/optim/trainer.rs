//! Adversarial training orchestration.
//!
//! One epoch is one [`train_step`]:
//! 1. real batch → generator (inference) → fake
//! 2. discriminator update on `(real, 1)`, then on `(fake, 0)`
//! 3. second, independent real batch → frozen extractor → perceptual targets
//! 4. generator update through the composite against `(1, targets)`
//!
//! Around the step, [`train`] handles the periodic side effects (loss log,
//! checkpoints, samples). Those never abort a run; failures are logged.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use super::loss::{discriminator_loss, scalar_value, DiscriminatorLossRecord, LossRecord};
use super::pretrain::prepare_generator;
use super::step::{adam_optimizers, GanOptimizers, Trainable};
use crate::core::{Result, TrainingConfig};
use crate::io::checkpoint::{save_composite, save_generator, GENERATOR_FILE};
use crate::io::{write_samples, ImagePairBatch, LossLog, PairSource};
use crate::model::{AdversarialModel, Discriminator, Generator};

/// Checkpoints live in this subdirectory of the output directory.
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Losses of one [`train_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLosses {
    pub discriminator: DiscriminatorLossRecord,
    pub generator: LossRecord,
}

/// What a finished [`train`] run reports back.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs: usize,
    /// `None` only when no epoch ran.
    pub last: Option<StepLosses>,
    pub elapsed: Duration,
}

/// Two discriminator updates: real patches toward 1, then fake patches toward 0.
///
/// `fake` comes from the inner backend, so no generator graph is attached and
/// the generator cannot move.
pub fn discriminator_step<B, OG, OD>(
    model: AdversarialModel<B>,
    optimizers: &mut GanOptimizers<OG, OD>,
    real: Tensor<B, 4>,
    fake: Tensor<B::InnerBackend, 4>,
) -> (AdversarialModel<B>, DiscriminatorLossRecord)
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let objective = model.discriminator_objective;

    let loss = discriminator_loss(model.discriminator.forward(real), 1.0, objective);
    let real_loss = scalar_value(&loss);
    let model = optimizers.step(model, Trainable::Discriminator, loss);

    let fake = Tensor::from_inner(fake);
    let loss = discriminator_loss(model.discriminator.forward(fake), 0.0, objective);
    let fake_loss = scalar_value(&loss);
    let model = optimizers.step(model, Trainable::Discriminator, loss);

    (
        model,
        DiscriminatorLossRecord {
            real: real_loss,
            fake: fake_loss,
        },
    )
}

/// One generator update through the composite.
pub fn generator_step<B, OG, OD>(
    model: AdversarialModel<B>,
    optimizers: &mut GanOptimizers<OG, OD>,
    batch: ImagePairBatch<B>,
) -> Result<(AdversarialModel<B>, LossRecord)>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let targets = Tensor::from_inner(model.target_features(batch.high_res.clone())?);
    let loss = model.generator_loss(batch.low_res, batch.high_res, targets)?;
    let model = optimizers.step(model, Trainable::Generator, loss.total);
    Ok((model, loss.record))
}

/// Discriminator step then generator step, each on its own freshly drawn batch.
pub fn train_step<B, S, OG, OD>(
    model: AdversarialModel<B>,
    optimizers: &mut GanOptimizers<OG, OD>,
    source: &mut S,
    batch_size: usize,
    upscale: usize,
) -> Result<(AdversarialModel<B>, StepLosses)>
where
    B: AutodiffBackend,
    S: PairSource<B>,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let batch = source.load_batch(batch_size, upscale, false)?;
    let fake = model.generate(batch.low_res)?;
    let (model, discriminator) = discriminator_step(model, optimizers, batch.high_res, fake);

    let batch = source.load_batch(batch_size, upscale, false)?;
    let (model, generator) = generator_step(model, optimizers, batch)?;

    Ok((
        model,
        StepLosses {
            discriminator,
            generator,
        },
    ))
}

/// Draw `count` test pairs and write them as samples labelled `epoch`.
pub fn sample_images<B, S>(
    generator: &Generator<B>,
    source: &mut S,
    count: usize,
    upscale: usize,
    dir: &Path,
    epoch: usize,
) -> Result<Vec<f64>>
where
    B: AutodiffBackend,
    S: PairSource<B>,
{
    if count == 0 {
        return Ok(Vec::new());
    }
    let batch = source.load_batch(count, upscale, true)?.inner();
    write_samples(&generator.valid(), batch, dir, epoch)
}

/// Full run: build models, apply the pretrain mode, then `epochs` train steps.
///
/// Writes into `config.output_dir`: `loss.txt`, samples with `psnr.txt`, and
/// `checkpoints/`.
pub fn train<B, S>(
    config: &TrainingConfig,
    source: &mut S,
    device: &B::Device,
) -> anyhow::Result<TrainingSummary>
where
    B: AutodiffBackend,
    S: PairSource<B>,
{
    config.validate()?;
    B::seed(config.seed);

    let output_dir = PathBuf::from(&config.output_dir);
    let checkpoint_dir = output_dir.join(CHECKPOINT_DIR);
    std::fs::create_dir_all(&checkpoint_dir)
        .with_context(|| format!("failed to create {}", checkpoint_dir.display()))?;

    let mut model = AdversarialModel::<B>::new(config, device).context("failed to build models")?;
    info!(
        upscale = config.model.upscale,
        input_dim = config.model.input_dim,
        high_res_dim = config.model.high_res_dim(),
        residual_blocks = config.model.residual_blocks,
        "models ready"
    );

    model.generator = prepare_generator(
        config,
        model.generator,
        source,
        &output_dir,
        &checkpoint_dir,
        device,
    )
    .context("generator pretraining failed")?;

    let mut optimizers = adam_optimizers::<B>(config.learning_rate);
    let loss_log = LossLog::in_dir(&output_dir);
    let upscale = config.model.upscale;
    let start = Instant::now();
    let mut last = None;

    for epoch in 0..config.epochs {
        let (next, losses) = train_step(
            model,
            &mut optimizers,
            source,
            config.batch_size,
            upscale,
        )
        .with_context(|| format!("train step failed at epoch {epoch}"))?;
        model = next;
        last = Some(losses);

        info!(
            epoch,
            elapsed = ?start.elapsed(),
            d_loss = losses.discriminator.mean(),
            "{}",
            losses.generator.to_log_line()
        );
        if !losses.generator.is_finite() {
            warn!(epoch, "generator loss is not finite");
        }

        if epoch % config.log_interval == 0 {
            if let Err(e) = loss_log.append(&losses.generator) {
                warn!(epoch, error = %e, "failed to append loss log");
            }
        }

        if epoch % config.checkpoint_interval == config.checkpoint_interval - 1 {
            match save_composite(&model, &checkpoint_dir, epoch) {
                Ok(()) => info!(epoch, "saved composite checkpoint"),
                Err(e) => warn!(epoch, error = %e, "failed to save composite checkpoint"),
            }
        }

        if epoch % config.generator_interval == config.generator_interval - 1 {
            if let Err(e) = save_generator(&model.generator, &checkpoint_dir.join(GENERATOR_FILE)) {
                warn!(epoch, error = %e, "failed to save generator");
            }
        }

        if epoch % config.sample_interval == 0 {
            if let Err(e) = sample_images(
                &model.generator,
                source,
                config.samples_per_event,
                upscale,
                &output_dir,
                epoch,
            ) {
                warn!(epoch, error = %e, "failed to write samples");
            }
        }
    }

    let elapsed = start.elapsed();
    info!(epochs = config.epochs, ?elapsed, "training finished");
    Ok(TrainingSummary {
        epochs: config.epochs,
        last,
        elapsed,
    })
}
