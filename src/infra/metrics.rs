// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Two files per run directory:
//
//   scalars.jsonl — written live by ScalarLog, the MetricsSink
//                   the trainer pushes into. One JSON object per
//                   scalar:
//                     {"tag":"train_loss","step":0,"value":2.31}
//                   A NaN value (empty pass) is written as null.
//
//   stats.csv     — written once at the end of a run from the
//                   collected EpochStats, one row per epoch:
//                     train_loss,train_acc,val_loss,val_acc
//                     2.301,11.5,2.288,14.2
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::{epoch_stats::EpochStats, traits::MetricsSink};

pub const SCALARS_FILE: &str = "scalars.jsonl";
pub const STATS_FILE:   &str = "stats.csv";

/// One line of `scalars.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag:   String,
    pub step:  usize,
    pub value: Option<f64>,
}

/// Appends every scalar to `scalars.jsonl` as it arrives.
pub struct ScalarLog {
    path: PathBuf,
    file: File,
}

impl ScalarLog {
    /// Create (or truncate) `scalars.jsonl` inside `dir`.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log dir '{}'", dir.display()))?;

        let path = dir.join(SCALARS_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        tracing::debug!("Created scalar log: '{}'", path.display());

        Ok(Self { path, file })
    }
}

impl MetricsSink for ScalarLog {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let record = ScalarRecord {
            tag:   tag.to_string(),
            step,
            value: value.is_finite().then_some(value),
        };
        writeln!(self.file, "{}", serde_json::to_string(&record)?)
            .with_context(|| format!("Cannot append to '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Write `stats.csv` into `dir`, one row per epoch in order.
pub fn write_stats_csv(dir: impl AsRef<Path>, history: &[EpochStats]) -> Result<PathBuf> {
    let path = dir.as_ref().join(STATS_FILE);

    let mut csv = String::from("train_loss,train_acc,val_loss,val_acc\n");
    for stats in history {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            stats.train_loss, stats.train_acc, stats.val_loss, stats.val_acc
        ));
    }

    fs::write(&path, csv)
        .with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Wrote {} epochs to '{}'", history.len(), path.display());
    Ok(path)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn stats(epoch: usize, train_loss: f64, val_loss: f64) -> EpochStats {
        EpochStats { epoch, train_loss, train_acc: 50.0, val_loss, val_acc: 25.0 }
    }

    #[test]
    fn test_scalar_log_writes_one_line_per_scalar() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = ScalarLog::create(tmp.path()).unwrap();
        log.add_scalar("train_loss", 1.5, 0).unwrap();
        log.add_scalar("val_loss", f64::NAN, 3).unwrap();

        let text = fs::read_to_string(tmp.path().join(SCALARS_FILE)).unwrap();
        let records: Vec<ScalarRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ScalarRecord { tag: "train_loss".into(), step: 0, value: Some(1.5) });
        assert_eq!(records[1].step, 3);
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_stats_csv_layout() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = write_stats_csv(tmp.path(), &[stats(0, 2.25, 2.5), stats(1, 1.75, f64::NAN)]).unwrap();

        let text  = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["train_loss,train_acc,val_loss,val_acc", "2.25,50,2.5,25", "1.75,50,NaN,25"]);
    }

    #[test]
    fn test_stats_csv_with_no_epochs_has_only_header() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = write_stats_csv(tmp.path(), &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "train_loss,train_acc,val_loss,val_acc\n");
    }
}
