//! U-Net generator mapping masks to satellite images.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

use super::blocks::{DownBlock, UpBlock};

const DEPTH: usize = 4;

/// Configuration for the UnetGenerator
#[derive(Config, Debug)]
pub struct UnetGeneratorConfig {
    /// Channels of the condition image
    pub condition_channels: usize,
    /// Channels of the generated satellite image
    pub output_channels: usize,
    /// Filters of the first encoder stage; doubled at every following stage
    #[config(default = "16")]
    pub base_filters: usize,
}

/// Encoder/decoder generator with skip connections.
///
/// Input H and W must be multiples of 16. Output values lie in [0, 1].
#[derive(Module, Debug)]
pub struct UnetGenerator<B: Backend> {
    pub down: Vec<DownBlock<B>>,
    pub up: Vec<UpBlock<B>>,
    pub output: Conv2d<B>,
}

impl UnetGeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UnetGenerator<B> {
        let filters = |level: usize| self.base_filters << level;

        // condition -> f -> 2f -> 4f -> 8f
        let mut down = Vec::with_capacity(DEPTH);
        let mut channels = self.condition_channels;
        for level in 0..DEPTH {
            down.push(DownBlock::new(channels, filters(level), level > 0, device));
            channels = filters(level);
        }

        // 8f -> 4f (+4f skip) -> 2f (+2f skip) -> f (+f skip) -> f
        let mut up = Vec::with_capacity(DEPTH);
        for level in (0..DEPTH - 1).rev() {
            up.push(UpBlock::new(channels, filters(level), device));
            channels = filters(level) * 2;
        }
        up.push(UpBlock::new(channels, filters(0), device));

        let output = Conv2dConfig::new([filters(0), self.output_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        UnetGenerator { down, up, output }
    }
}

impl<B: Backend> UnetGenerator<B> {
    pub fn forward(&self, condition: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut skips = Vec::with_capacity(self.down.len());
        let mut x = condition;
        for block in &self.down {
            x = block.forward(x);
            skips.push(x.clone());
        }
        // the bottleneck is `x` itself
        skips.pop();

        for block in &self.up {
            x = block.forward(x);
            if let Some(skip) = skips.pop() {
                x = Tensor::cat(vec![x, skip], 1);
            }
        }

        sigmoid(self.output.forward(x))
    }
}
