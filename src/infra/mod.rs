// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of a run:
//
//   run_dir.rs    — Directory layout
//                   <log_dir>/<run_name>_overshoot_<o>/version_<n>
//                   plus run_config.json for provenance
//
//   metrics.rs    — Metrics output
//                   ScalarLog streams scalars.jsonl while the
//                   trainer runs; stats.csv is written at the end
//
//   checkpoint.rs — Final model weights
//                   Burn's NamedMpkGzFileRecorder → model.mpk.gz
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Scalar log and stats CSV
pub mod metrics;

/// Run directory naming and provenance
pub mod run_dir;
