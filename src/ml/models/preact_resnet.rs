//! Pre-activation ResNet-18.
//!
//! "Identity Mappings in Deep Residual Networks", He et al. 2016.
//! Batch norm and ReLU run before each convolution; the skip path
//! carries the un-normalised signal.

use burn::{
    nn::{
        conv::Conv2d,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::{conv, resnet::RESNET18_STAGES, ImageClassifier};

#[derive(Config, Debug)]
pub struct PreActResNetConfig {
    pub num_classes: usize,
}

impl PreActResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PreActResNet<B> {
        let mut blocks = Vec::new();
        let mut c_in = 64;
        for (c_out, stride, count) in RESNET18_STAGES {
            for index in 0..count {
                let stride = if index == 0 { stride } else { 1 };
                blocks.push(PreActBlock::new(c_in, c_out, stride, device));
                c_in = c_out;
            }
        }

        PreActResNet {
            stem: conv([3, 64], 3, 1, 1, device),
            blocks,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc:   LinearConfig::new(512, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PreActBlock<B: Backend> {
    pub norm1:    BatchNorm<B, 2>,
    pub conv1:    Conv2d<B>,
    pub norm2:    BatchNorm<B, 2>,
    pub conv2:    Conv2d<B>,
    pub shortcut: Option<Conv2d<B>>,
}

impl<B: Backend> PreActBlock<B> {
    fn new(c_in: usize, c_out: usize, stride: usize, device: &B::Device) -> Self {
        let shortcut = (stride != 1 || c_in != c_out).then(|| conv([c_in, c_out], 1, stride, 1, device));
        Self {
            norm1: BatchNormConfig::new(c_in).init(device),
            conv1: conv([c_in, c_out], 3, stride, 1, device),
            norm2: BatchNormConfig::new(c_out).init(device),
            conv2: conv([c_out, c_out], 3, 1, 1, device),
            shortcut,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = relu(self.norm1.forward(x.clone()));
        // Projection sees the activated input, identity sees the raw one
        let skip = match &self.shortcut {
            Some(projection) => projection.forward(out.clone()),
            None => x,
        };
        let out = self.conv1.forward(out);
        let out = self.conv2.forward(relu(self.norm2.forward(out)));
        out + skip
    }
}

#[derive(Module, Debug)]
pub struct PreActResNet<B: Backend> {
    pub stem:   Conv2d<B>,
    pub blocks: Vec<PreActBlock<B>>,
    pub pool:   AdaptiveAvgPool2d,
    pub fc:     Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for PreActResNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.stem.forward(images);
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
        let model  = PreActResNetConfig::new(4).init::<NdArray>(&device);
        assert_eq!(logits_dims(&model, 2, &device), [2, 4]);
    }
}
