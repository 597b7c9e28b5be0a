//! srgan-train: train an SRGAN super-resolution model
//!
//! Usage:
//!   srgan-train --datadir ./data --outputdir ./outputs --upscale 4 --inputdim 64
//!   srgan-train --config run.json --epochs 500
//!   srgan-train --synthetic --upscale 4 --inputdim 8 --nresblocks 2 --epochs 10

mod train_utils;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Parser, ValueEnum};
use srgan_rs::core::{DiscriminatorLoss, ModelConfig, PretrainMode, TrainingConfig};
use srgan_rs::io::{ImageFolderSource, SyntheticSource};
use srgan_rs::train;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use train_utils::run_dir::{create_run_directory, save_run_metadata};

#[cfg(not(feature = "gpu"))]
type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
#[cfg(feature = "gpu")]
type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PretrainArg {
    Off,
    Pretrain,
    Load,
}

impl From<PretrainArg> for PretrainMode {
    fn from(arg: PretrainArg) -> Self {
        match arg {
            PretrainArg::Off => PretrainMode::Off,
            PretrainArg::Pretrain => PretrainMode::Pretrain,
            PretrainArg::Load => PretrainMode::LoadPretrained,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiscriminatorLossArg {
    Mse,
    Bce,
}

impl From<DiscriminatorLossArg> for DiscriminatorLoss {
    fn from(arg: DiscriminatorLossArg) -> Self {
        match arg {
            DiscriminatorLossArg::Mse => DiscriminatorLoss::Mse,
            DiscriminatorLossArg::Bce => DiscriminatorLoss::Bce,
        }
    }
}

/// Command-line flags. Anything given here overrides the `--config` file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON training configuration to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of training images
    #[arg(long)]
    datadir: Option<String>,

    /// Directory for samples, logs and checkpoints
    #[arg(long)]
    outputdir: Option<String>,

    /// Put outputs in a fresh timestamped `runs/` subdirectory with this name
    #[arg(long)]
    run_name: Option<String>,

    /// Upscaling factor (power of two)
    #[arg(long)]
    upscale: Option<usize>,

    /// Low-resolution input side length
    #[arg(long)]
    inputdim: Option<usize>,

    /// Number of generator residual blocks
    #[arg(long)]
    nresblocks: Option<usize>,

    #[arg(long)]
    lr: Option<f64>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    batchsize: Option<usize>,

    /// Generator pretraining before the adversarial phase
    #[arg(long, value_enum)]
    pretrain: Option<PretrainArg>,

    #[arg(long)]
    pretrain_epochs: Option<usize>,

    #[arg(long)]
    pretrain_batchsize: Option<usize>,

    #[arg(long)]
    pretrain_images: Option<usize>,

    /// Number of samples written after pretraining
    #[arg(long)]
    load_img_cnt: Option<usize>,

    #[arg(long, value_enum)]
    discriminator_loss: Option<DiscriminatorLossArg>,

    /// Weight of the optional pixel MSE term
    #[arg(long)]
    pixel_weight: Option<f64>,

    /// Burn record with pretrained VGG19 weights
    #[arg(long)]
    vgg_weights: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Train on random tensors instead of `--datadir`
    #[arg(long)]
    synthetic: bool,
}

impl Args {
    fn resolve(&self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)
                .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display()))?,
            None => TrainingConfig::new(ModelConfig::new(), "./data".into(), "./outputs".into()),
        };

        let model = &mut config.model;
        if let Some(v) = self.upscale {
            model.upscale = v;
        }
        if let Some(v) = self.inputdim {
            model.input_dim = v;
        }
        if let Some(v) = self.nresblocks {
            model.residual_blocks = v;
        }

        if let Some(v) = &self.datadir {
            config.data_dir = v.clone();
        }
        if let Some(v) = &self.outputdir {
            config.output_dir = v.clone();
        }
        if let Some(v) = self.lr {
            config.learning_rate = v;
        }
        if let Some(v) = self.epochs {
            config.epochs = v;
        }
        if let Some(v) = self.batchsize {
            config.batch_size = v;
        }
        if let Some(v) = self.pretrain {
            config.pretrain = v.into();
        }
        if let Some(v) = self.pretrain_epochs {
            config.pretrain_epochs = v;
        }
        if let Some(v) = self.pretrain_batchsize {
            config.pretrain_batch_size = v;
        }
        if let Some(v) = self.pretrain_images {
            config.pretrain_images = v;
        }
        if let Some(v) = self.load_img_cnt {
            config.sample_count = v;
        }
        if let Some(v) = self.discriminator_loss {
            config.discriminator_loss = v.into();
        }
        if let Some(v) = self.pixel_weight {
            config.pixel_weight = v;
        }
        if let Some(v) = &self.vgg_weights {
            config.vgg_weights = Some(v.clone());
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = args.resolve()?;

    if let Some(name) = &args.run_name {
        let dir = create_run_directory(Path::new(&config.output_dir).join("runs").as_path(), name)
            .context("failed to create run directory")?;
        config.output_dir = dir.to_string_lossy().into_owned();
    }
    let output_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let command_line: Vec<String> = std::env::args().collect();
    if let Err(e) = save_run_metadata(&output_dir, &command_line, config.seed) {
        warn!(error = %e, "failed to save run metadata");
    }
    config
        .save(output_dir.join("config.json"))
        .context("failed to save config.json")?;

    info!(
        version = srgan_rs::VERSION,
        output_dir = %output_dir.display(),
        "srgan-train"
    );

    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let high_res_dim = config.model.high_res_dim();

    let summary = if args.synthetic {
        let mut source = SyntheticSource::<TrainBackend>::new(high_res_dim, &device);
        train::<TrainBackend, _>(&config, &mut source, &device)?
    } else {
        let mut source = ImageFolderSource::<TrainBackend>::new(
            Path::new(&config.data_dir),
            high_res_dim,
            config.seed,
            &device,
        )
        .with_context(|| format!("failed to open dataset {}", config.data_dir))?;
        info!(images = source.len(), "dataset ready");
        train::<TrainBackend, _>(&config, &mut source, &device)?
    };

    match summary.last {
        Some(last) => info!(
            epochs = summary.epochs,
            elapsed = ?summary.elapsed,
            d_loss = last.discriminator.mean(),
            "final losses {}",
            last.generator.to_log_line()
        ),
        None => info!(epochs = summary.epochs, "no epochs run"),
    }
    Ok(())
}
