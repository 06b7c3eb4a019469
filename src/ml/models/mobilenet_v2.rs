//! MobileNet v2 for CIFAR.
//!
//! "MobileNetV2: Inverted Residuals and Linear Bottlenecks",
//! Sandler et al. 2018. The first two strides are 1 instead of 2
//! so 32x32 inputs are not downsampled too early.

use burn::{
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::{ConvNorm, ImageClassifier};

// (expansion, output channels, blocks, stride of the first block)
const STAGES: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 1),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

const HEAD_CHANNELS: usize = 1280;

#[derive(Config, Debug)]
pub struct MobileNetV2Config {
    pub num_classes: usize,
}

impl MobileNetV2Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MobileNetV2<B> {
        let mut blocks = Vec::new();
        let mut c_in = 32;
        for (expansion, c_out, count, stride) in STAGES {
            for index in 0..count {
                let stride = if index == 0 { stride } else { 1 };
                blocks.push(InvertedResidual::new(c_in, c_out, expansion, stride, device));
                c_in = c_out;
            }
        }

        MobileNetV2 {
            stem: ConvNorm::new([3, 32], 3, 1, 1, device),
            blocks,
            head: ConvNorm::new([c_in, HEAD_CHANNELS], 1, 1, 1, device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc:   LinearConfig::new(HEAD_CHANNELS, self.num_classes).init(device),
        }
    }
}

/// Skip path of a stride-1 block: identity, or 1x1 projection when
/// the channel count changes.
#[derive(Module, Debug)]
pub struct Residual<B: Backend> {
    pub projection: Option<ConvNorm<B>>,
}

/// Expand (1x1) → depthwise (3x3) → linear project (1x1).
#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    pub expand:    ConvNorm<B>,
    pub depthwise: ConvNorm<B>,
    pub project:   ConvNorm<B>,
    pub residual:  Option<Residual<B>>,
}

impl<B: Backend> InvertedResidual<B> {
    fn new(c_in: usize, c_out: usize, expansion: usize, stride: usize, device: &B::Device) -> Self {
        let hidden = expansion * c_in;
        let residual = (stride == 1).then(|| Residual {
            projection: (c_in != c_out).then(|| ConvNorm::new([c_in, c_out], 1, 1, 1, device)),
        });
        Self {
            expand:    ConvNorm::new([c_in, hidden], 1, 1, 1, device),
            depthwise: ConvNorm::new([hidden, hidden], 3, stride, hidden, device),
            project:   ConvNorm::new([hidden, c_out], 1, 1, 1, device),
            residual,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = relu(self.expand.forward(x.clone()));
        let out = relu(self.depthwise.forward(out));
        let out = self.project.forward(out);
        match &self.residual {
            Some(Residual { projection: Some(projection) }) => out + projection.forward(x),
            Some(Residual { projection: None }) => out + x,
            None => out,
        }
    }
}

#[derive(Module, Debug)]
pub struct MobileNetV2<B: Backend> {
    pub stem:   ConvNorm<B>,
    pub blocks: Vec<InvertedResidual<B>>,
    pub head:   ConvNorm<B>,
    pub pool:   AdaptiveAvgPool2d,
    pub fc:     Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for MobileNetV2<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.stem.forward(images));
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x = relu(self.head.forward(x));
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
        let model  = MobileNetV2Config::new(10).init::<NdArray>(&device);
        assert_eq!(model.blocks.len(), 17);
        assert_eq!(logits_dims(&model, 1, &device), [1, 10]);
    }
}
