//! LeNet-5 adapted to 3-channel 32x32 inputs.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use super::ImageClassifier;

#[derive(Config, Debug)]
pub struct LeNetConfig {
    pub num_classes: usize,
}

impl LeNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LeNet<B> {
        LeNet {
            conv1: Conv2dConfig::new([3, 6], [5, 5]).init(device),
            conv2: Conv2dConfig::new([6, 16], [5, 5]).init(device),
            pool:  MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:   LinearConfig::new(16 * 5 * 5, 120).init(device),
            fc2:   LinearConfig::new(120, 84).init(device),
            fc3:   LinearConfig::new(84, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LeNet<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub pool:  MaxPool2d,
    pub fc1:   Linear<B>,
    pub fc2:   Linear<B>,
    pub fc3:   Linear<B>,
}

impl<B: Backend> ImageClassifier<B> for LeNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images))); // [N, 6, 14, 14]
        let x = self.pool.forward(relu(self.conv2.forward(x)));      // [N, 16, 5, 5]
        let x = x.flatten::<2>(1, 3);
        let x = relu(self.fc1.forward(x));
        let x = relu(self.fc2.forward(x));
        self.fc3.forward(x)
    }
}
