//! Shared convolutional blocks.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, LeakyRelu, LeakyReluConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// 4×4 stride-2 convolution, optional BatchNorm, LeakyReLU(0.2). Halves H and W.
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: Option<BatchNorm<B, 2>>,
    pub activation: LeakyRelu,
}

impl<B: Backend> DownBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, normalize: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let norm = if normalize {
            Some(BatchNormConfig::new(out_channels).init(device))
        } else {
            None
        };

        Self {
            conv,
            norm,
            activation: LeakyReluConfig::new().with_negative_slope(0.2).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        self.activation.forward(x)
    }
}

/// 4×4 stride-2 transposed convolution, BatchNorm, ReLU. Doubles H and W.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    pub conv: ConvTranspose2d<B>,
    pub norm: BatchNorm<B, 2>,
    pub activation: Relu,
}

impl<B: Backend> UpBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = ConvTranspose2dConfig::new([in_channels, out_channels], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);

        Self {
            conv,
            norm: BatchNormConfig::new(out_channels).init(device),
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}
