// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, updates or runs a network lives here.
//
//   models/      — The six CIFAR architectures behind `--model`
//                  and the selector that builds one by name
//
//   optimizer.rs — Momentum SGD in two flavours:
//                  • Plain     → Burn's Sgd
//                  • Overshoot → trains at an extrapolated point,
//                    evaluates at the base point
//
//   scheduler.rs — Cosine annealing of the learning rate, per epoch
//
//   trainer.rs   — The epoch loop: training pass, evaluation pass,
//                  metrics, final checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// CIFAR-sized image classifiers
pub mod models;

/// SGD with optional overshoot
pub mod optimizer;

/// Learning-rate schedule
pub mod scheduler;

/// Train / evaluate loop
pub mod trainer;
