// ============================================================
// Layer 4 — Image Dataset
// ============================================================
// Implements Burn's Dataset trait over decoded images so the
// DataLoader can call .get(index) and .len().
//
// Two sources fill it:
//   cifar.rs               → the real CIFAR-10 records
//   ImageDataset::synthetic → seeded colour blobs for smoke runs

use std::sync::Arc;

use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const IMAGE_CHANNELS: usize = 3;
pub const IMAGE_SIZE: usize = 32;
pub const PIXELS_PER_IMAGE: usize = IMAGE_CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// One 3x32x32 image in CHW byte order plus its class label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    pub pixels: Vec<u8>,
    pub label:  usize,
}

/// In-memory image dataset. Items sit behind an Arc so each run
/// can hand its own copy to a DataLoader without duplicating pixels.
#[derive(Debug, Clone)]
pub struct ImageDataset {
    items:   Arc<Vec<ImageItem>>,
    classes: usize,
}

impl ImageDataset {
    pub fn new(items: Vec<ImageItem>, classes: usize) -> Self {
        Self { items: Arc::new(items), classes }
    }

    /// Deterministic stand-in for CIFAR-10: every class gets its own
    /// colour signature, each sample adds bounded noise on top.
    /// Labels cycle 0, 1, .., classes-1 so every class is present.
    pub fn synthetic(samples: usize, classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let classes = classes.max(1);

        let items = (0..samples)
            .map(|index| {
                let label = index % classes;
                let mut pixels = Vec::with_capacity(PIXELS_PER_IMAGE);
                for channel in 0..IMAGE_CHANNELS {
                    let signature = ((label * 97 + channel * 53) % 192) as u8;
                    for _ in 0..IMAGE_SIZE * IMAGE_SIZE {
                        pixels.push(signature + rng.gen_range(0..64u8));
                    }
                }
                ImageItem { pixels, label }
            })
            .collect();

        Self::new(items, classes)
    }

    pub fn classes(&self) -> usize { self.classes }

    pub fn sample_count(&self) -> usize { self.items.len() }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        let a = ImageDataset::synthetic(6, 2, 9);
        let b = ImageDataset::synthetic(6, 2, 9);
        for i in 0..6 {
            assert_eq!(a.get(i).unwrap().pixels, b.get(i).unwrap().pixels);
        }
        let c = ImageDataset::synthetic(6, 2, 10);
        assert_ne!(a.get(0).unwrap().pixels, c.get(0).unwrap().pixels);
    }

    #[test]
    fn test_synthetic_shapes_and_labels() {
        let ds = ImageDataset::synthetic(5, 2, 0);
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.classes(), 2);
        let labels: Vec<usize> = (0..5).map(|i| ds.get(i).unwrap().label).collect();
        assert_eq!(labels, vec![0, 1, 0, 1, 0]);
        assert!((0..5).all(|i| ds.get(i).unwrap().pixels.len() == PIXELS_PER_IMAGE));
        assert!(ds.get(5).is_none());
    }
}
