// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full invocation in order:
//
//   Step 1: Resolve the model name      (Layer 3 - domain)
//   Step 2: Load CIFAR-10 / synthetic   (Layer 4 - data)
//   Step 3: Save run_config.json        (Layer 6 - infra)
//   Step 4: For each seed:
//             reseed the backend,
//             create version_<seed+1>/,
//             train + evaluate          (Layer 5 - ml)
//             write stats.csv           (Layer 6 - infra)
//
// Step 1 runs before anything touches the filesystem, so an
// unknown model name aborts with no directories created.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{cifar, dataset::ImageDataset};
use crate::domain::{epoch_stats::EpochStats, model_kind::ModelKind};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{write_stats_csv, ScalarLog},
    run_dir::RunLayout,
};
use crate::ml::{
    models::with_model,
    optimizer::SgdSettings,
    trainer::{TrainSettings, Trainer},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything one invocation needs. Serialisable so the exact
// configuration is stored next to the runs it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub run_name:         String,
    pub model:            String,
    pub lr:               f64,
    /// None when `--overshoot` was not given; the factor is then 0
    pub overshoot:        Option<f64>,
    pub epochs:           usize,
    pub runs:             u64,
    pub momentum:         f64,
    pub weight_decay:     f32,
    pub train_batch_size: usize,
    pub test_batch_size:  usize,
    pub num_workers:      usize,
    pub log_dir:          String,
    pub data:             DataSource,
    pub backend:          BackendKind,
}

impl TrainConfig {
    pub fn overshoot_factor(&self) -> f64 {
        self.overshoot.unwrap_or(0.0)
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            run_name:         "run".to_string(),
            model:            "resnet".to_string(),
            lr:               0.1,
            overshoot:        None,
            epochs:           200,
            runs:             2,
            momentum:         0.9,
            weight_decay:     5e-4,
            train_batch_size: 128,
            test_batch_size:  100,
            num_workers:      2,
            log_dir:          "tensorboard".to_string(),
            data:             DataSource::Cifar10 { dir: "data/cifar-10-batches-bin".to_string() },
            backend:          BackendKind::Wgpu,
        }
    }
}

/// Where the images come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// The binary CIFAR-10 distribution in `dir`
    Cifar10 { dir: String },
    /// Generated colour-signature images, for smoke runs
    Synthetic { train_samples: usize, test_samples: usize, classes: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Wgpu,
    Ndarray,
}

/// What one seed produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub seed:    u64,
    pub dir:     PathBuf,
    pub history: Vec<EpochStats>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run every seed of the invocation end to end.
    pub fn execute(&self) -> Result<Vec<RunReport>> {
        // ── Step 1: Resolve the architecture ─────────────────────────────────
        let kind: ModelKind = self.config.model.parse()?;

        match self.config.backend {
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.run_all::<Autodiff<Wgpu>>(kind, device)
            }
            BackendKind::Ndarray => {
                tracing::info!("Using NdArray CPU backend");
                self.run_all::<Autodiff<NdArray>>(kind, NdArrayDevice::default())
            }
        }
    }

    fn run_all<B: AutodiffBackend>(&self, kind: ModelKind, device: B::Device) -> Result<Vec<RunReport>> {
        let cfg = &self.config;

        // ── Step 2: Load data ─────────────────────────────────────────────────
        let (train, test) = load_data(&cfg.data)?;
        let classes = train.classes();

        // ── Step 3: Provenance ────────────────────────────────────────────────
        let layout = RunLayout::new(&cfg.log_dir, &cfg.run_name, cfg.overshoot);
        layout.write_run_config(cfg)?;
        tracing::info!("Logging runs under '{}'", layout.base_dir().display());

        let mut settings = TrainSettings {
            epochs:           cfg.epochs,
            lr:               cfg.lr,
            sgd:              SgdSettings::new()
                .with_momentum(cfg.momentum)
                .with_weight_decay(cfg.weight_decay)
                .with_overshoot(cfg.overshoot_factor()),
            train_batch_size: cfg.train_batch_size,
            test_batch_size:  cfg.test_batch_size,
            num_workers:      cfg.num_workers,
            seed:             0,
        };

        // ── Step 4: One run per seed ──────────────────────────────────────────
        let mut reports = Vec::new();
        for seed in 0..cfg.runs {
            let torch_seed = 11 * seed;
            B::seed(torch_seed);
            settings.seed = torch_seed;

            let dir      = layout.create_version_dir(seed)?;
            let mut sink = ScalarLog::create(&dir)?;
            tracing::info!("==> Run {}/{} (seed {}) in '{}'", seed + 1, cfg.runs, torch_seed, dir.display());

            let trainer = Trainer::<B> {
                settings:   &settings,
                train:      train.clone(),
                test:       test.clone(),
                device:     device.clone(),
                sink:       &mut sink,
                checkpoint: Some(CheckpointManager::new(&dir)?),
            };
            let history = with_model::<B, _>(kind, classes, &device, trainer)?;

            write_stats_csv(&dir, &history)?;
            reports.push(RunReport { seed, dir, history });
        }

        Ok(reports)
    }
}

fn load_data(source: &DataSource) -> Result<(ImageDataset, ImageDataset)> {
    match source {
        DataSource::Cifar10 { dir } => {
            tracing::info!("==> Preparing CIFAR-10 from '{}'", dir);
            let splits = cifar::load_dir(dir)?;
            Ok((splits.train, splits.test))
        }
        DataSource::Synthetic { train_samples, test_samples, classes } => {
            tracing::info!(
                "==> Generating synthetic data: {} train, {} test, {} classes",
                train_samples, test_samples, classes
            );
            Ok((
                ImageDataset::synthetic(*train_samples, *classes, 0),
                ImageDataset::synthetic(*test_samples, *classes, 1),
            ))
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::domain::model_kind::ModelSelectError;

    fn smoke_config(log_dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            run_name:         "smoke".to_string(),
            model:            "lenet".to_string(),
            epochs:           1,
            runs:             1,
            train_batch_size: 2,
            test_batch_size:  2,
            num_workers:      0,
            log_dir:          log_dir.display().to_string(),
            data:             DataSource::Synthetic { train_samples: 2, test_samples: 2, classes: 2 },
            backend:          BackendKind::Ndarray,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_unknown_model_fails_before_any_work() {
        let tmp     = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("logs");
        let config  = TrainConfig {
            model: "not_a_model".to_string(),
            data:  DataSource::Cifar10 { dir: "does/not/exist".to_string() },
            ..smoke_config(&log_dir)
        };

        let err = TrainUseCase::new(config).execute().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ModelSelectError>(),
            Some(&ModelSelectError::Unsupported("not_a_model".to_string()))
        );
        assert!(!log_dir.exists());
    }

    #[test]
    fn test_single_epoch_writes_one_stats_row() {
        let tmp     = tempfile::tempdir().unwrap();
        let reports = TrainUseCase::new(smoke_config(tmp.path())).execute().unwrap();

        assert_eq!(reports.len(), 1);
        // No --overshoot: the directory suffix is the bare default
        let dir = tmp.path().join("smoke_overshoot_0").join("version_1");
        assert_eq!(reports[0].dir, dir);

        let csv   = fs::read_to_string(dir.join("stats.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "train_loss,train_acc,val_loss,val_acc");

        let row: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(row.len(), 4);
        assert!(row.iter().all(|v| v.is_finite()));

        assert_eq!(fs::read_to_string(dir.join("scalars.jsonl")).unwrap().lines().count(), 4);
        assert!(dir.join("model.mpk.gz").exists());
        assert!(tmp.path().join("smoke_overshoot_0").join("run_config.json").exists());
    }

    #[test]
    fn test_each_seed_gets_its_own_version_dir() {
        let tmp    = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            runs:      2,
            overshoot: Some(0.9),
            ..smoke_config(tmp.path())
        };

        let reports = TrainUseCase::new(config).execute().unwrap();
        let seeds: Vec<u64> = reports.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, [0, 1]);

        let base = tmp.path().join("smoke_overshoot_0.9");
        assert!(base.join("version_1").join("stats.csv").exists());
        assert!(base.join("version_2").join("stats.csv").exists());
    }

    #[test]
    fn test_missing_cifar_dir_is_an_error() {
        let tmp    = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            data: DataSource::Cifar10 { dir: tmp.path().join("empty").display().to_string() },
            ..smoke_config(tmp.path())
        };
        let err = TrainUseCase::new(config).execute().unwrap_err();
        assert!(format!("{err:#}").contains("data_batch_1.bin"));
    }
}
