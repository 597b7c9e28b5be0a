//! Run directory naming and the metadata written next to a run's outputs.

use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

/// Create `{root}/YYYYMMDD_HHMM_{name}` (UTC), suffixing `.1`, `.2`, … on
/// collision.
pub fn create_run_directory(root: &Path, name: &str) -> std::io::Result<PathBuf> {
    let now = OffsetDateTime::now_utc();

    let sanitized = name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
    let dir_name = format!(
        "{:04}{:02}{:02}_{:02}{:02}_{}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        sanitized
    );

    let base = root.join(&dir_name);
    let mut path = base.clone();
    let mut counter = 1;
    while path.exists() {
        path = root.join(format!("{dir_name}.{counter}"));
        counter += 1;
    }

    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Write `run_metadata.txt` into `out_dir`.
pub fn save_run_metadata(out_dir: &Path, args: &[String], seed: u64) -> std::io::Result<()> {
    let mut file = std::fs::File::create(out_dir.join("run_metadata.txt"))?;

    writeln!(file, "=== Training Run Metadata ===")?;
    writeln!(file)?;
    writeln!(file, "Command:")?;
    writeln!(file, "{}", args.join(" "))?;
    writeln!(file)?;

    writeln!(file, "Started: {}", OffsetDateTime::now_utc())?;
    writeln!(file, "Seed: {seed}")?;
    writeln!(file)?;

    writeln!(file, "System:")?;
    writeln!(file, "  Platform: {}", std::env::consts::OS)?;
    writeln!(file, "  Architecture: {}", std::env::consts::ARCH)?;
    writeln!(file, "  Package version: {}", srgan_rs::VERSION)?;

    Ok(())
}
