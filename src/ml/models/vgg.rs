//! VGG-19 with batch normalisation, sized for 32x32 inputs.
//!
//! Five stages of 3x3 convolutions, each closed by a 2x2 max-pool,
//! leave a 512x1x1 feature map that a single linear layer classifies.

use burn::{
    nn::{
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::{ConvNorm, ImageClassifier};

// Output channels of every convolution, one slice per stage.
const VGG19_STAGES: [&[usize]; 5] = [
    &[64, 64],
    &[128, 128],
    &[256, 256, 256, 256],
    &[512, 512, 512, 512],
    &[512, 512, 512, 512],
];

#[derive(Config, Debug)]
pub struct VggConfig {
    pub num_classes: usize,
}

impl VggConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg<B> {
        let mut c_in = 3;
        let stages = VGG19_STAGES
            .iter()
            .map(|widths| {
                let convs = widths
                    .iter()
                    .map(|&c_out| {
                        let layer = ConvNorm::new([c_in, c_out], 3, 1, 1, device);
                        c_in = c_out;
                        layer
                    })
                    .collect();
                VggStage { convs }
            })
            .collect();

        Vgg {
            stages,
            pool:       MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            classifier: LinearConfig::new(512, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct VggStage<B: Backend> {
    pub convs: Vec<ConvNorm<B>>,
}

#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
    pub stages:     Vec<VggStage<B>>,
    pub pool:       MaxPool2d,
    pub classifier: Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for Vgg<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for stage in &self.stages {
            for conv in &stage.convs {
                x = relu(conv.forward(x));
            }
            x = self.pool.forward(x);
        }
        self.classifier.forward(x.flatten::<2>(1, 3))
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
        let model  = VggConfig::new(10).init::<NdArray>(&device);
        assert_eq!(model.stages.iter().map(|s| s.convs.len()).sum::<usize>(), 16);
        assert_eq!(logits_dims(&model, 1, &device), [1, 10]);
    }
}
