// ============================================================
// Layer 6 — Run Directory Layout
// ============================================================
// Where each run's files go:
//
//   <log_dir>/
//     <run_name>_overshoot_<overshoot>/
//       run_config.json        ← full TrainConfig of the invocation
//       version_1/             ← seed 0
//         stats.csv
//         scalars.jsonl
//         model.mpk.gz
//       version_2/             ← seed 1
//       ...
//
// Without `--overshoot` the suffix is a bare `0`. A given factor
// is printed in Python's float repr: `--overshoot 0` lands in
// `<run_name>_overshoot_0.0`, `--overshoot 1e-5` in `..._1e-05`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const RUN_CONFIG_FILE: &str = "run_config.json";

#[derive(Debug, Clone)]
pub struct RunLayout {
    base: PathBuf,
}

impl RunLayout {
    pub fn new(log_dir: impl AsRef<Path>, run_name: &str, overshoot: Option<f64>) -> Self {
        let base = log_dir
            .as_ref()
            .join(format!("{run_name}_overshoot_{}", format_overshoot(overshoot)));
        Self { base }
    }

    /// `<log_dir>/<run_name>_overshoot_<overshoot>`
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// `version_<seed + 1>` under the base dir. Not created.
    pub fn version_dir(&self, seed: u64) -> PathBuf {
        self.base.join(format!("version_{}", seed + 1))
    }

    pub fn create_version_dir(&self, seed: u64) -> Result<PathBuf> {
        let dir = self.version_dir(seed);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run dir '{}'", dir.display()))?;
        Ok(dir)
    }

    /// Record the invocation's configuration next to its runs.
    pub fn write_run_config<T: Serialize>(&self, config: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.base)
            .with_context(|| format!("Cannot create run dir '{}'", self.base.display()))?;

        let path = self.base.join(RUN_CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(path)
    }
}

/// `None` → `0`, otherwise [`float_repr`] of the given factor.
pub fn format_overshoot(overshoot: Option<f64>) -> String {
    match overshoot {
        None        => "0".to_string(),
        Some(value) => float_repr(value),
    }
}

/// Shortest round-trip digits, laid out like Python's `repr(float)`:
/// positional for exponents in `-4..16`, otherwise `d.ddde±XX`.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` already yields the shortest digits, e.g. `1.5e-5`
    let sci = format!("{value:e}");
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return sci;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None       => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        let point = exponent + 1;
        if point <= 0 {
            return format!("{sign}0.{}{digits}", "0".repeat(point.unsigned_abs() as usize));
        }
        let point = point as usize;
        if digits.len() <= point {
            format!("{sign}{digits}{}.0", "0".repeat(point - digits.len()))
        } else {
            format!("{sign}{}.{}", &digits[..point], &digits[point..])
        }
    } else {
        let (lead, rest) = digits.split_at(1);
        let fraction     = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign     = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{lead}{fraction}e{exp_sign}{:02}", exponent.unsigned_abs())
    }
}
