//! Model checkpoints as burn `CompactRecorder` files.
//!
//! Paths passed in here are stems: the recorder's `.mpk` extension is applied
//! on both save and load, so `dir/generator_model` and `dir/generator_model.mpk`
//! name the same file.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;

use crate::core::{Error, Result};
use crate::model::{AdversarialModel, Generator};

/// Generator snapshot overwritten during training.
pub const GENERATOR_FILE: &str = "generator_model";
/// Generator saved after pixel-loss pretraining.
pub const PRETRAINED_FILE: &str = "srresnet";

/// Extension `CompactRecorder` gives its files.
pub const RECORD_EXTENSION: &str = "mpk";

/// File the recorder reads or writes for `stem`.
pub fn record_path(stem: &Path) -> PathBuf {
    stem.with_extension(RECORD_EXTENSION)
}

pub fn save_module<B: Backend, M: Module<B>>(module: &M, stem: &Path) -> Result<()> {
    module
        .clone()
        .save_file(stem.to_path_buf(), &CompactRecorder::new())
        .map_err(|e| Error::Checkpoint {
            path: record_path(stem),
            reason: format!("{e:?}"),
        })
}

/// Load a record into `module`. A missing file is [`Error::MissingCheckpoint`];
/// an unreadable or incompatible one is [`Error::Checkpoint`].
///
/// A record is compatible only if it fits `module` layer for layer and yields
/// the same number of parameters. A record built with a different residual-block
/// count, upscale factor or filter width is rejected.
pub fn load_module<B: Backend, M: Module<B>>(module: M, stem: &Path, device: &B::Device) -> Result<M> {
    let path = record_path(stem);
    if !path.is_file() {
        return Err(Error::MissingCheckpoint(path));
    }
    let incompatible = |reason: String| Error::Checkpoint {
        path: path.clone(),
        reason,
    };

    let record: M::Record =
        Recorder::<B>::load(&CompactRecorder::new(), stem.to_path_buf(), device)
            .map_err(|e| incompatible(format!("{e:?}")))?;

    // burn asserts on structural mismatches (e.g. a `Vec` of layers of the wrong length).
    let expected = module.num_params();
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| module.load_record(record)))
        .map_err(|payload| incompatible(panic_reason(payload)))?;

    let found = loaded.num_params();
    if found != expected {
        return Err(incompatible(format!(
            "record has {found} parameters, model expects {expected}"
        )));
    }
    Ok(loaded)
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "record does not match the model".to_string()
    }
}

/// `model_ckpt_{epoch}_generator.mpk` and `model_ckpt_{epoch}_discriminator.mpk`.
pub fn save_composite<B: AutodiffBackend>(
    model: &AdversarialModel<B>,
    dir: &Path,
    epoch: usize,
) -> Result<()> {
    let prefix = format!("model_ckpt_{epoch}");
    save_module(&model.generator, &dir.join(format!("{prefix}_generator")))?;
    save_module(&model.discriminator, &dir.join(format!("{prefix}_discriminator")))
}

pub fn save_generator<B: Backend>(generator: &Generator<B>, stem: &Path) -> Result<()> {
    save_module(generator, stem)
}

/// Replace `generator`'s weights with the ones stored at `stem`.
pub fn load_generator<B: Backend>(
    generator: Generator<B>,
    stem: &Path,
    device: &B::Device,
) -> Result<Generator<B>> {
    load_module(generator, stem, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_path_adds_extension_once() {
        assert_eq!(
            record_path(Path::new("out/generator_model")),
            PathBuf::from("out/generator_model.mpk")
        );
        assert_eq!(
            record_path(Path::new("out/srresnet.mpk")),
            PathBuf::from("out/srresnet.mpk")
        );
    }
}
