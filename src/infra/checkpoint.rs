// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves the final model of a run as gzipped MessagePack in half
// precision (Burn's NamedMpkGzFileRecorder).
//
// For an overshoot run the trainer switches to the base point
// first, so the weights on disk are always the base trajectory.
//
// File layout, inside the run's version directory:
//   version_<n>/
//     model.mpk.gz   ← final weights
//
// The extension comes from the recorder itself, so the logged
// path is always the file that was written.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FileRecorder, HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

/// Gzipped MessagePack, half precision.
pub type CheckpointRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// File stem of the weights file; the recorder appends its extension.
pub const MODEL_FILE_STEM: &str = "model";

/// Saves model weights into one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates `dir` (and parents) if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Path of the weights file as written by the recorder.
    pub fn model_path<B: Backend>(&self) -> PathBuf {
        let extension = <CheckpointRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(format!("{MODEL_FILE_STEM}.{extension}"))
    }

    /// Write the weights of any network; returns the file written.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf> {
        let stem = self.dir.join(MODEL_FILE_STEM);

        let recorder = CheckpointRecorder::new();
        <CheckpointRecorder as Recorder<B>>::record(&recorder, model.clone().into_record(), stem.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", stem.display())
            })?;

        let path = self.model_path::<B>();
        tracing::debug!("Saved checkpoint: {}", path.display());
        Ok(path)
    }
}
