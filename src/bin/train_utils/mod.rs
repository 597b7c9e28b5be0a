//! Helpers for the `srgan-train` binary.

pub mod run_dir;
