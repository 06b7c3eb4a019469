// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw bytes on disk to tensor batches:
//
//   cifar-10-batches-bin/*.bin   (or the synthetic generator)
//       │
//       ▼
//   cifar::load_dir   → parses 3073-byte records into ImageItems
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → normalises and stacks items into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the binary CIFAR-10 distribution
pub mod cifar;

/// Implements Burn's Dataset trait for images, plus a synthetic set
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
