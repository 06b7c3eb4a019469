// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag of a training job. Long names use underscores
// (`--run_name`, `--weight_decay`) to match the run scripts.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// The model name stays a plain string here; the use case
// resolves it so an unknown name is reported as an
// "Unsupported model name" error rather than a usage error.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, ValueEnum};
use crate::application::train_use_case::{BackendKind, DataSource, TrainConfig};

/// Samples per split when `--synthetic` replaces CIFAR-10.
const SYNTHETIC_TRAIN_SAMPLES: usize = 512;
const SYNTHETIC_TEST_SAMPLES:  usize = 128;

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Prefix of the log directory for this experiment
    #[arg(long = "run_name")]
    pub run_name: String,

    /// Architecture: vgg, resnet, pre_act_resnet, mobilenet, mobilenet_v2, lenet
    #[arg(long)]
    pub model: String,

    /// Initial learning rate (cosine-annealed to 0)
    #[arg(long, default_value_t = 0.1)]
    pub lr: f64,

    /// Overshoot factor [default: 0]; 0 trains with plain momentum SGD
    #[arg(long)]
    pub overshoot: Option<f64>,

    /// Epochs per run
    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    /// Number of seeds, each logged to its own version_<n> directory
    #[arg(long, default_value_t = 2)]
    pub runs: u64,

    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// L2 penalty added to every gradient
    #[arg(long = "weight_decay", default_value_t = 5e-4)]
    pub weight_decay: f32,

    #[arg(long = "train_batch_size", default_value_t = 128)]
    pub train_batch_size: usize,

    #[arg(long = "test_batch_size", default_value_t = 100)]
    pub test_batch_size: usize,

    /// Data-loading threads; 0 loads on the training thread
    #[arg(long = "num_workers", default_value_t = 2)]
    pub num_workers: usize,

    /// Directory holding the CIFAR-10 binary files
    #[arg(long = "data_dir", default_value = "data/cifar-10-batches-bin")]
    pub data_dir: String,

    /// Root directory for run logs
    #[arg(long = "log_dir", default_value = "tensorboard")]
    pub log_dir: String,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,

    /// Train on generated images instead of CIFAR-10
    #[arg(long)]
    pub synthetic: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    /// GPU through WGPU
    Wgpu,
    /// CPU through ndarray
    Ndarray,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Wgpu    => BackendKind::Wgpu,
            BackendArg::Ndarray => BackendKind::Ndarray,
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let data = if a.synthetic {
            DataSource::Synthetic {
                train_samples: SYNTHETIC_TRAIN_SAMPLES,
                test_samples:  SYNTHETIC_TEST_SAMPLES,
                classes:       crate::data::cifar::CIFAR10_CLASSES,
            }
        } else {
            DataSource::Cifar10 { dir: a.data_dir }
        };

        TrainConfig {
            run_name:         a.run_name,
            model:            a.model,
            lr:               a.lr,
            overshoot:        a.overshoot,
            epochs:           a.epochs,
            runs:             a.runs,
            momentum:         a.momentum,
            weight_decay:     a.weight_decay,
            train_batch_size: a.train_batch_size,
            test_batch_size:  a.test_batch_size,
            num_workers:      a.num_workers,
            log_dir:          a.log_dir,
            data,
            backend:          a.backend.into(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["overshoot-cifar", "--run_name", "exp", "--model", "resnet"]).unwrap();
        let cfg: TrainConfig = cli.train.into();

        assert_eq!(cfg.run_name, "exp");
        assert_eq!(cfg.model, "resnet");
        assert_eq!(cfg.lr, 0.1);
        assert_eq!(cfg.overshoot, None);
        assert_eq!(cfg.overshoot_factor(), 0.0);
        assert_eq!(cfg.epochs, 200);
        assert_eq!(cfg.runs, 2);
        assert_eq!(cfg.backend, BackendKind::Wgpu);
        assert_eq!(cfg.data, DataSource::Cifar10 { dir: "data/cifar-10-batches-bin".to_string() });
    }

    #[test]
    fn test_overrides_and_synthetic() {
        let cli = Cli::try_parse_from([
            "overshoot-cifar", "--run_name", "exp", "--model", "lenet",
            "--lr", "0.05", "--overshoot", "0.9", "--backend", "ndarray",
            "--train_batch_size", "32", "--synthetic",
        ])
        .unwrap();
        let cfg: TrainConfig = cli.train.into();

        assert_eq!(cfg.lr, 0.05);
        assert_eq!(cfg.overshoot, Some(0.9));
        assert_eq!(cfg.train_batch_size, 32);
        assert_eq!(cfg.backend, BackendKind::Ndarray);
        assert!(matches!(cfg.data, DataSource::Synthetic { classes: 10, .. }));
    }

    #[test]
    fn test_overshoot_flag_names_the_run_directory() {
        use crate::infra::run_dir::RunLayout;

        let dir_for = |extra: &[&str]| {
            let mut argv = vec!["overshoot-cifar", "--run_name", "exp", "--model", "lenet"];
            argv.extend_from_slice(extra);
            let cfg: TrainConfig = Cli::try_parse_from(argv).unwrap().train.into();
            RunLayout::new("tb", &cfg.run_name, cfg.overshoot).base_dir().to_path_buf()
        };

        assert_eq!(dir_for(&[]), std::path::Path::new("tb/exp_overshoot_0"));
        assert_eq!(dir_for(&["--overshoot", "0"]), std::path::Path::new("tb/exp_overshoot_0.0"));
        assert_eq!(dir_for(&["--overshoot", "1e-5"]), std::path::Path::new("tb/exp_overshoot_1e-05"));
    }

    #[test]
    fn test_run_name_and_model_are_required() {
        assert!(Cli::try_parse_from(["overshoot-cifar", "--model", "resnet"]).is_err());
        assert!(Cli::try_parse_from(["overshoot-cifar", "--run_name", "exp"]).is_err());
    }

    #[test]
    fn test_unknown_model_is_not_a_usage_error() {
        // Rejected later by the use case, with the domain error
        let cli = Cli::try_parse_from(["overshoot-cifar", "--run_name", "exp", "--model", "not_a_model"]);
        assert!(cli.is_ok());
    }
}
