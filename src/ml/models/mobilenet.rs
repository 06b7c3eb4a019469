//! MobileNet v1 for CIFAR.
//!
//! "MobileNets: Efficient Convolutional Neural Networks for Mobile
//! Vision Applications", Howard et al. 2017.

use burn::{
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::{ConvNorm, ImageClassifier};

// (output channels, stride) of each depthwise-separable block
const BLOCKS: [(usize, usize); 13] = [
    (64, 1),
    (128, 2),
    (128, 1),
    (256, 2),
    (256, 1),
    (512, 2),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (1024, 2),
    (1024, 1),
];

#[derive(Config, Debug)]
pub struct MobileNetConfig {
    pub num_classes: usize,
}

impl MobileNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MobileNet<B> {
        let mut c_in = 32;
        let blocks = BLOCKS
            .iter()
            .map(|&(c_out, stride)| {
                let block = SeparableBlock {
                    depthwise: ConvNorm::new([c_in, c_in], 3, stride, c_in, device),
                    pointwise: ConvNorm::new([c_in, c_out], 1, 1, 1, device),
                };
                c_in = c_out;
                block
            })
            .collect();

        MobileNet {
            stem: ConvNorm::new([3, 32], 3, 1, 1, device),
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc:   LinearConfig::new(1024, self.num_classes).init(device),
        }
    }
}

/// Depthwise 3x3 followed by pointwise 1x1.
#[derive(Module, Debug)]
pub struct SeparableBlock<B: Backend> {
    pub depthwise: ConvNorm<B>,
    pub pointwise: ConvNorm<B>,
}

impl<B: Backend> SeparableBlock<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.depthwise.forward(x));
        relu(self.pointwise.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct MobileNet<B: Backend> {
    pub stem:   ConvNorm<B>,
    pub blocks: Vec<SeparableBlock<B>>,
    pub pool:   AdaptiveAvgPool2d,
    pub fc:     Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for MobileNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.stem.forward(images));
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = self.pool.forward(x).flatten::<2>(1, 3);
        self.fc.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::test_support::logits_dims;
    use burn::backend::NdArray;

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model  = MobileNetConfig::new(10).init::<NdArray>(&device);
        assert_eq!(logits_dims(&model, 1, &device), [1, 10]);
    }
}
