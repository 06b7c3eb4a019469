// ============================================================
// Layer 5 — Architectures
// ============================================================
// The closed set of CIFAR-sized networks behind `--model`.
// Every network maps [N, 3, 32, 32] images to [N, classes]
// logits through the ImageClassifier trait, so the trainer can
// be written once and monomorphised per architecture.
//
//   vgg            → VGG-19 (batch norm)
//   resnet         → ResNet-18
//   pre_act_resnet → pre-activation ResNet-18
//   mobilenet      → MobileNet v1
//   mobilenet_v2   → MobileNet v2
//   lenet          → LeNet-5
//
// Reference: Burn Book §3 (Building Blocks)

pub mod lenet;
pub mod mobilenet;
pub mod mobilenet_v2;
pub mod preact_resnet;
pub mod resnet;
pub mod vgg;

use burn::{
    module::AutodiffModule,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::model_kind::ModelKind;

use lenet::LeNetConfig;
use mobilenet::MobileNetConfig;
use mobilenet_v2::MobileNetV2Config;
use preact_resnet::PreActResNetConfig;
use resnet::ResNetConfig;
use vgg::VggConfig;

/// A network that scores every image of a batch against each class.
pub trait ImageClassifier<B: Backend> {
    /// images: [N, 3, H, W] → logits: [N, classes]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

/// Receives the freshly built network for whichever kind was selected.
///
/// Each architecture is its own type, so instead of returning a
/// model the selector hands it to a runner that is generic over it.
pub trait ModelRunner<B: AutodiffBackend> {
    type Output;

    fn run<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + ImageClassifier<B>,
        M::InnerModule: ImageClassifier<B::InnerBackend>;
}

/// Build the network for `kind` on `device` and pass it to `runner`.
pub fn with_model<B, R>(kind: ModelKind, num_classes: usize, device: &B::Device, runner: R) -> R::Output
where
    B: AutodiffBackend,
    R: ModelRunner<B>,
{
    tracing::info!("==> Building model {} ({} classes)", kind, num_classes);
    match kind {
        ModelKind::Vgg          => runner.run(VggConfig::new(num_classes).init::<B>(device)),
        ModelKind::Resnet       => runner.run(ResNetConfig::new(num_classes).init::<B>(device)),
        ModelKind::PreActResnet => runner.run(PreActResNetConfig::new(num_classes).init::<B>(device)),
        ModelKind::Mobilenet    => runner.run(MobileNetConfig::new(num_classes).init::<B>(device)),
        ModelKind::MobilenetV2  => runner.run(MobileNetV2Config::new(num_classes).init::<B>(device)),
        ModelKind::Lenet        => runner.run(LeNetConfig::new(num_classes).init::<B>(device)),
    }
}

/// Bias-free square convolution with "same" padding for odd kernels.
pub(crate) fn conv<B: Backend>(
    channels: [usize; 2],
    kernel:   usize,
    stride:   usize,
    groups:   usize,
    device:   &B::Device,
) -> Conv2d<B> {
    let padding = kernel / 2;
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_groups(groups)
        .with_bias(false)
        .init(device)
}

/// Convolution followed by batch norm; callers add the activation.
#[derive(Module, Debug)]
pub struct ConvNorm<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvNorm<B> {
    pub fn new(
        channels: [usize; 2],
        kernel:   usize,
        stride:   usize,
        groups:   usize,
        device:   &B::Device,
    ) -> Self {
        Self {
            conv: conv(channels, kernel, stride, groups, device),
            norm: BatchNormConfig::new(channels[1]).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use burn::prelude::*;

    use super::ImageClassifier;

    /// Run a forward pass on `batch` random images and return the logits shape.
    pub fn logits_dims<B: Backend, M: ImageClassifier<B>>(model: &M, batch: usize, device: &B::Device) -> [usize; 2] {
        let images = Tensor::<B, 4>::random(
            [batch, 3, 32, 32],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            device,
        );
        model.forward(images).dims()
    }
}
