// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The trainer never writes files itself. It pushes scalars into
// a MetricsSink; Layer 6 decides where they end up.

use anyhow::Result;

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// Anything that accepts named scalar series indexed by step.
///
/// Implementations:
///   - ScalarLog → appends JSON lines to `scalars.jsonl`
pub trait MetricsSink {
    /// Record `value` for the series `tag` at `step` (the epoch index).
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;
}
