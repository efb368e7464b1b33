//! PatchGAN discriminator.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};
use sentinel_core::DISCRIMINATOR_DOWNSAMPLING;

use super::blocks::DownBlock;

/// Configuration for the PatchDiscriminator
#[derive(Config, Debug)]
pub struct PatchDiscriminatorConfig {
    /// Channels of the (real or synthetic) satellite image
    pub image_channels: usize,
    /// Channels of the condition image
    pub condition_channels: usize,
    /// Filters of the first stage; doubled at every following stage
    #[config(default = "16")]
    pub base_filters: usize,
}

/// Scores `(image, condition)` patches as real or fake.
///
/// Architecture:
/// - image and condition concatenated on the channel axis
/// - four DownBlocks (stride 2), BatchNorm on all but the first
/// - 3×3 head to a single channel, sigmoid
///
/// A `[N, C, H, W]` input yields a `[N, 1, H/16, W/16]` validity map.
#[derive(Module, Debug)]
pub struct PatchDiscriminator<B: Backend> {
    pub blocks: Vec<DownBlock<B>>,
    pub head: Conv2d<B>,
}

impl PatchDiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PatchDiscriminator<B> {
        let stages = DISCRIMINATOR_DOWNSAMPLING.trailing_zeros() as usize;
        let mut blocks = Vec::with_capacity(stages);
        let mut channels = self.image_channels + self.condition_channels;

        for stage in 0..stages {
            let filters = self.base_filters << stage;
            blocks.push(DownBlock::new(channels, filters, stage > 0, device));
            channels = filters;
        }

        let head = Conv2dConfig::new([channels, 1], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        PatchDiscriminator { blocks, head }
    }
}

impl<B: Backend> PatchDiscriminator<B> {
    pub fn forward(&self, image: Tensor<B, 4>, condition: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = Tensor::cat(vec![image, condition], 1);
        for block in &self.blocks {
            x = block.forward(x);
        }
        sigmoid(self.head.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_validity_map_is_downsampled_by_16() {
        let device = Default::default();
        let model = PatchDiscriminatorConfig::new(3, 1)
            .with_base_filters(4)
            .init::<TestBackend>(&device);

        let image = Tensor::zeros([2, 3, 64, 32], &device);
        let condition = Tensor::zeros([2, 1, 64, 32], &device);
        let validity = model.forward(image, condition);
        assert_eq!(validity.dims(), [2, 1, 4, 2]);
    }

    #[test]
    fn test_validity_is_a_probability() {
        let device = Default::default();
        let model = PatchDiscriminatorConfig::new(3, 1)
            .with_base_filters(4)
            .init::<TestBackend>(&device);

        let validity = model.forward(
            Tensor::ones([1, 3, 32, 32], &device),
            Tensor::ones([1, 1, 32, 32], &device),
        );
        let values = validity.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_four_stages() {
        let device = Default::default();
        let model = PatchDiscriminatorConfig::new(3, 3).init::<TestBackend>(&device);
        assert_eq!(model.blocks.len(), 4);
        assert!(model.blocks[0].norm.is_none());
        assert!(model.blocks[3].norm.is_some());
    }
}
