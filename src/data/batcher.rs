// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageItem> into
// one normalised image tensor plus a target tensor.
//
//   Input:  N items, 3072 bytes each (CHW)
//   Output: images  [N, 3, 32, 32]  float, per-channel normalised
//           targets [N]             int
//
// Normalisation uses the CIFAR-10 channel statistics:
//   x = (byte / 255 - mean[c]) / std[c]

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{ImageItem, IMAGE_CHANNELS, IMAGE_SIZE};

pub const CHANNEL_MEAN: [f32; IMAGE_CHANNELS] = [0.4914, 0.4822, 0.4465];
pub const CHANNEL_STD:  [f32; IMAGE_CHANNELS] = [0.2023, 0.1994, 0.2010];

/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// Class indices, shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// Normalise one byte of channel `c`.
pub fn normalise(byte: u8, c: usize) -> f32 {
    (byte as f32 / 255.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c]
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let plane      = IMAGE_SIZE * IMAGE_SIZE;

        // CHW bytes are already in tensor order; channel = offset / plane
        let values: Vec<f32> = items
            .iter()
            .flat_map(|item| {
                item.pixels
                    .iter()
                    .enumerate()
                    .map(move |(offset, &byte)| normalise(byte, offset / plane))
            })
            .collect();

        let labels: Vec<i32> = items.iter().map(|item| item.label as i32).collect();

        let images = Tensor::<B, 1>::from_floats(values.as_slice(), &self.device)
            .reshape([batch_size, IMAGE_CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::PIXELS_PER_IMAGE;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes() {
        let items = vec![
            ImageItem { pixels: vec![0; PIXELS_PER_IMAGE], label: 4 },
            ImageItem { pixels: vec![255; PIXELS_PER_IMAGE], label: 7 },
        ];
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(items);

        assert_eq!(batch.images.dims(), [2, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![4, 7]);
    }

    #[test]
    fn test_per_channel_normalisation() {
        let mut pixels = vec![0u8; PIXELS_PER_IMAGE];
        // Last pixel of the blue plane
        pixels[PIXELS_PER_IMAGE - 1] = 255;
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![ImageItem { pixels, label: 0 }]);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - (-0.4914 / 0.2023)).abs() < 1e-5);
        assert!((values[1024] - (-0.4822 / 0.1994)).abs() < 1e-5);
        assert!((values[PIXELS_PER_IMAGE - 1] - (1.0 - 0.4465) / 0.2010).abs() < 1e-5);
    }
}
