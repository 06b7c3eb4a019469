// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that name the core
// concepts of a training run.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// The ML layer (Layer 5) turns these into tensors and models;
// the infra layer (Layer 6) persists them.

// The closed set of selectable architectures
pub mod model_kind;

// Per-epoch record and the running-average accumulator
pub mod epoch_stats;

// Core abstractions (traits) that other layers implement
pub mod traits;
