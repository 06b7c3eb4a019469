//! ResNet-18 for CIFAR.
//!
//! "Deep Residual Learning for Image Recognition", He et al. 2015.
//! The ImageNet stem (7x7 stride-2 conv + max-pool) is replaced by a
//! single 3x3 conv so 32x32 inputs keep enough spatial resolution.

use burn::{
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::{ConvNorm, ImageClassifier};

// (output channels, stride of the first block, blocks per stage)
pub(crate) const RESNET18_STAGES: [(usize, usize, usize); 4] =
    [(64, 1, 2), (128, 2, 2), (256, 2, 2), (512, 2, 2)];

#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub num_classes: usize,
}

impl ResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let mut blocks = Vec::new();
        let mut c_in = 64;
        for (c_out, stride, count) in RESNET18_STAGES {
            for index in 0..count {
                let stride = if index == 0 { stride } else { 1 };
                blocks.push(BasicBlock::new(c_in, c_out, stride, device));
                c_in = c_out;
            }
        }

        ResNet {
            stem: ConvNorm::new([3, 64], 3, 1, 1, device),
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc:   LinearConfig::new(512, self.num_classes).init(device),
        }
    }
}

/// Two 3x3 conv-bn layers with an identity or 1x1 projection skip.
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1:    ConvNorm<B>,
    pub conv2:    ConvNorm<B>,
    pub shortcut: Option<ConvNorm<B>>,
}

impl<B: Backend> BasicBlock<B> {
    fn new(c_in: usize, c_out: usize, stride: usize, device: &B::Device) -> Self {
        let shortcut = (stride != 1 || c_in != c_out)
            .then(|| ConvNorm::new([c_in, c_out], 1, stride, 1, device));
        Self {
            conv1: ConvNorm::new([c_in, c_out], 3, stride, 1, device),
            conv2: ConvNorm::new([c_out, c_out], 3, 1, 1, device),
            shortcut,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = relu(self.conv1.forward(x.clone()));
        let out = self.conv2.forward(out);
        let skip = match &self.shortcut {
            Some(projection) => projection.forward(x),
            None => x,
        };
        relu(out + skip)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub stem:   ConvNorm<B>,
    pub blocks: Vec<BasicBlock<B>>,
    pub pool:   AdaptiveAvgPool2d,
    pub fc:     Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for ResNet<B> {
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
        let model  = ResNetConfig::new(10).init::<NdArray>(&device);
        assert_eq!(model.blocks.len(), 8);
        // Only the first block of stages 2..4 changes shape
        assert_eq!(model.blocks.iter().filter(|b| b.shortcut.is_some()).count(), 3);
        assert_eq!(logits_dims(&model, 2, &device), [2, 10]);
    }
}
