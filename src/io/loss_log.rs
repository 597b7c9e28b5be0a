//! Append-only text log of generator losses.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::Result;
use crate::optim::loss::LossRecord;

pub const LOSS_LOG_FILE: &str = "loss.txt";

/// One line per logged epoch: `combined adversarial perceptual`.
#[derive(Debug, Clone)]
pub struct LossLog {
    path: PathBuf,
}

impl LossLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `loss.txt` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LOSS_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens, appends and closes, so nothing is lost if the run dies.
    pub fn append(&self, record: &LossRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.to_log_line())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = LossLog::in_dir(dir.path());
        let record = LossRecord {
            combined: 1.0,
            adversarial: 0.5,
            perceptual: 0.25,
        };
        log.append(&record).unwrap();
        log.append(&LossRecord::default()).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["1.000 0.500 0.250", "0.000 0.000 0.000"]);
    }
}
