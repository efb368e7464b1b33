//! Composite adversarial model: generator output wired into the discriminator.

use std::path::Path;

use burn::{
    module::Module,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
};
use sentinel_core::{CganConfig, Error, ImageShape, LossRecord, OptimizerConfig, Result};
use tracing::{debug, info};

use crate::adapter::{adam, BurnDiscriminator, BurnGenerator};
use crate::checkpoint::Checkpointable;
use crate::loss::{ensure_same_dims, mean_absolute_error, mean_squared_error, scalar};
use crate::model::{PatchDiscriminator, PatchDiscriminatorConfig, UnetGenerator, UnetGeneratorConfig};
use crate::network::{CompositeModel, Discriminator, Generator};

const GENERATOR_RECORD: &str = "generator";
const DISCRIMINATOR_RECORD: &str = "discriminator";

/// The joint `(image, condition) -> (validity, synthetic image)` graph.
///
/// The condition feeds the generator; the synthetic image and the condition
/// feed the discriminator. The real-image input is checked against
/// `input_shape` but does not contribute to either output.
///
/// Losses: mean absolute error on the validity head plus mean squared error
/// on the image head. The composite keeps its own optimizer state, separate
/// from the discriminator's. Unless `freeze_discriminator` is set, the
/// composite update also moves discriminator weights.
pub struct ConditionalGan<B: AutodiffBackend, OD, OG, CD, CG> {
    discriminator: BurnDiscriminator<B, OD>,
    generator: BurnGenerator<B, OG>,
    composite_discriminator_optim: CD,
    composite_generator_optim: CG,
    learning_rate: f64,
    freeze_discriminator: bool,
    input_shape: ImageShape,
    condition_shape: ImageShape,
    device: B::Device,
}

impl<B, OD, OG, CD, CG> ConditionalGan<B, OD, OG, CD, CG>
where
    B: AutodiffBackend,
    OD: Optimizer<PatchDiscriminator<B>, B>,
    OG: Optimizer<UnetGenerator<B>, B>,
    CD: Optimizer<PatchDiscriminator<B>, B>,
    CG: Optimizer<UnetGenerator<B>, B>,
{
    /// Wires `generator` into `discriminator`.
    ///
    /// Probes both networks once with zero tensors and fails when the
    /// generator output does not match `input_shape` or the validity map is
    /// not `H/16 × W/16`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        discriminator: BurnDiscriminator<B, OD>,
        generator: BurnGenerator<B, OG>,
        input_shape: ImageShape,
        condition_shape: ImageShape,
        composite_discriminator_optim: CD,
        composite_generator_optim: CG,
        optimizer: &OptimizerConfig,
        freeze_discriminator: bool,
        device: &B::Device,
    ) -> Result<Self> {
        let model = Self {
            discriminator,
            generator,
            composite_discriminator_optim,
            composite_generator_optim,
            learning_rate: optimizer.learning_rate,
            freeze_discriminator,
            input_shape,
            condition_shape,
            device: device.clone(),
        };
        model.check_wiring()?;
        Ok(model)
    }

    fn check_wiring(&self) -> Result<()> {
        let condition = Tensor::<B, 4>::zeros(self.condition_shape.nchw(1), &self.device);
        let synthetic = self.generator.predict(condition.clone());
        if synthetic.dims() != self.input_shape.nchw(1) {
            return Err(Error::Model(format!(
                "generator produces {:?} for condition {}, expected input shape {}",
                synthetic.dims(),
                self.condition_shape,
                self.input_shape
            )));
        }

        let validity = self.discriminator.predict(synthetic, condition);
        let expected = self.input_shape.label_shape(1).nchw();
        if validity.dims() != expected {
            return Err(Error::Model(format!(
                "discriminator produces {:?}, label tensors are {:?}",
                validity.dims(),
                expected
            )));
        }
        debug!("composite wiring checked: validity map {:?}", expected);
        Ok(())
    }

    pub fn input_shape(&self) -> ImageShape {
        self.input_shape
    }

    pub fn condition_shape(&self) -> ImageShape {
        self.condition_shape
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn freezes_discriminator(&self) -> bool {
        self.freeze_discriminator
    }
}

impl<B, OD, OG, CD, CG> CompositeModel<B> for ConditionalGan<B, OD, OG, CD, CG>
where
    B: AutodiffBackend,
    OD: Optimizer<PatchDiscriminator<B>, B>,
    OG: Optimizer<UnetGenerator<B>, B>,
    CD: Optimizer<PatchDiscriminator<B>, B>,
    CG: Optimizer<UnetGenerator<B>, B>,
{
    type Discriminator = BurnDiscriminator<B, OD>;
    type Generator = BurnGenerator<B, OG>;

    fn discriminator(&self) -> &Self::Discriminator {
        &self.discriminator
    }

    fn discriminator_mut(&mut self) -> &mut Self::Discriminator {
        &mut self.discriminator
    }

    fn generator(&self) -> &Self::Generator {
        &self.generator
    }

    fn generator_mut(&mut self) -> &mut Self::Generator {
        &mut self.generator
    }

    fn train_step(
        &mut self,
        image: Tensor<B, 4>,
        condition: Tensor<B, 4>,
        validity_target: Tensor<B, 4>,
        image_target: Tensor<B, 4>,
    ) -> Result<LossRecord> {
        let [batch, ..] = image.dims();
        if image.dims() != self.input_shape.nchw(batch) {
            return Err(Error::Shape(format!(
                "composite image input {:?} does not match input shape {}",
                image.dims(),
                self.input_shape
            )));
        }

        let synthetic = self.generator.module.forward(condition.clone());
        let validity = self.discriminator.module.forward(synthetic.clone(), condition);
        ensure_same_dims(&validity, &validity_target, "composite validity")?;
        ensure_same_dims(&synthetic, &image_target, "composite image")?;

        let validity_loss = mean_absolute_error(validity, validity_target);
        let image_loss = mean_squared_error(synthetic, image_target);
        let loss = validity_loss.clone().add(image_loss.clone());

        let record = LossRecord::single("loss", scalar(&loss))
            .with("validity_loss", scalar(&validity_loss))
            .with("image_loss", scalar(&image_loss));

        let mut grads = loss.backward();
        let generator_grads = GradientsParams::from_module(&mut grads, &self.generator.module);
        self.generator.module = self.composite_generator_optim.step(
            self.learning_rate,
            self.generator.module.clone(),
            generator_grads,
        );

        if !self.freeze_discriminator {
            let discriminator_grads =
                GradientsParams::from_module(&mut grads, &self.discriminator.module);
            self.discriminator.module = self.composite_discriminator_optim.step(
                self.learning_rate,
                self.discriminator.module.clone(),
                discriminator_grads,
            );
        }

        Ok(record)
    }
}

impl<B, OD, OG, CD, CG> Checkpointable for ConditionalGan<B, OD, OG, CD, CG>
where
    B: AutodiffBackend,
    OD: Optimizer<PatchDiscriminator<B>, B>,
    OG: Optimizer<UnetGenerator<B>, B>,
    CD: Optimizer<PatchDiscriminator<B>, B>,
    CG: Optimizer<UnetGenerator<B>, B>,
{
    fn save_records(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let recorder = CompactRecorder::new();
        self.generator
            .module
            .clone()
            .save_file(dir.join(GENERATOR_RECORD), &recorder)
            .map_err(|e| Error::Serialization(format!("Failed to save generator: {e:?}")))?;
        self.discriminator
            .module
            .clone()
            .save_file(dir.join(DISCRIMINATOR_RECORD), &recorder)
            .map_err(|e| Error::Serialization(format!("Failed to save discriminator: {e:?}")))?;
        Ok(())
    }

    fn load_records(&mut self, dir: &Path) -> Result<()> {
        let recorder = CompactRecorder::new();
        self.generator.module = self
            .generator
            .module
            .clone()
            .load_file(dir.join(GENERATOR_RECORD), &recorder, &self.device)
            .map_err(|e| Error::Serialization(format!("Failed to load generator: {e:?}")))?;
        self.discriminator.module = self
            .discriminator
            .module
            .clone()
            .load_file(dir.join(DISCRIMINATOR_RECORD), &recorder, &self.device)
            .map_err(|e| Error::Serialization(format!("Failed to load discriminator: {e:?}")))?;
        Ok(())
    }
}

/// Builds the discriminator, generator and composite described by `config`.
///
/// Every network and the composite get their own Adam instance. The backend
/// RNG is seeded with `training.seed` first, so equal configs start from
/// equal weights.
#[allow(clippy::type_complexity)]
pub fn build_cgan<B: AutodiffBackend>(
    config: &CganConfig,
    device: &B::Device,
) -> Result<
    ConditionalGan<
        B,
        impl Optimizer<PatchDiscriminator<B>, B>,
        impl Optimizer<UnetGenerator<B>, B>,
        impl Optimizer<PatchDiscriminator<B>, B>,
        impl Optimizer<UnetGenerator<B>, B>,
    >,
> {
    config.model.validate()?;
    let model = &config.model;
    let optimizer = &config.optimizer;

    B::seed(config.training.seed);

    let discriminator_module = PatchDiscriminatorConfig::new(
        model.input_shape.channels,
        model.condition_shape.channels,
    )
    .with_base_filters(model.discriminator_filters)
    .init::<B>(device);
    let generator_module = UnetGeneratorConfig::new(
        model.condition_shape.channels,
        model.input_shape.channels,
    )
    .with_base_filters(model.generator_filters)
    .init::<B>(device);

    info!(
        "Building cGAN: input {} condition {} | D params {} | G params {}",
        model.input_shape,
        model.condition_shape,
        discriminator_module.num_params(),
        generator_module.num_params()
    );

    let discriminator = BurnDiscriminator::new(
        discriminator_module,
        adam(optimizer).init::<B, PatchDiscriminator<B>>(),
        optimizer.learning_rate,
        model.discriminator_loss,
    );
    let generator = BurnGenerator::new(
        generator_module,
        adam(optimizer).init::<B, UnetGenerator<B>>(),
        optimizer.learning_rate,
    );

    ConditionalGan::new(
        discriminator,
        generator,
        model.input_shape,
        model.condition_shape,
        adam(optimizer).init::<B, PatchDiscriminator<B>>(),
        adam(optimizer).init::<B, UnetGenerator<B>>(),
        optimizer,
        model.freeze_discriminator,
        device,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;
    use sentinel_core::ModelConfig;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn small_config(freeze_discriminator: bool) -> CganConfig {
        CganConfig {
            model: ModelConfig {
                input_shape: ImageShape::new(16, 16, 3),
                condition_shape: ImageShape::new(16, 16, 1),
                generator_filters: 4,
                discriminator_filters: 4,
                freeze_discriminator,
                ..ModelConfig::default()
            },
            ..CganConfig::default()
        }
    }

    fn discriminator_head<B: AutodiffBackend, O>(d: &BurnDiscriminator<B, O>) -> Vec<f32>
    where
        O: Optimizer<PatchDiscriminator<B>, B>,
    {
        d.module().head.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    fn generator_output<B: AutodiffBackend, O>(g: &BurnGenerator<B, O>) -> Vec<f32>
    where
        O: Optimizer<UnetGenerator<B>, B>,
    {
        g.module().output.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_build_checks_wiring() {
        let device = Default::default();
        let gan = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();
        assert_eq!(gan.input_shape(), ImageShape::new(16, 16, 3));
        assert!(!gan.freezes_discriminator());
    }

    #[test]
    fn test_build_rejects_invalid_shapes() {
        let device = Default::default();
        let mut config = small_config(false);
        config.model.input_shape = ImageShape::new(20, 20, 3);
        assert!(build_cgan::<TestBackend>(&config, &device).is_err());
    }

    #[test]
    fn test_new_rejects_miswired_generator() {
        let device = Default::default();
        let optimizer = OptimizerConfig::default();
        let discriminator = BurnDiscriminator::new(
            PatchDiscriminatorConfig::new(3, 1)
                .with_base_filters(4)
                .init::<TestBackend>(&device),
            adam(&optimizer).init::<TestBackend, PatchDiscriminator<TestBackend>>(),
            optimizer.learning_rate,
            Default::default(),
        );
        // one output channel where the satellite input has three
        let generator = BurnGenerator::new(
            UnetGeneratorConfig::new(1, 1)
                .with_base_filters(4)
                .init::<TestBackend>(&device),
            adam(&optimizer).init::<TestBackend, UnetGenerator<TestBackend>>(),
            optimizer.learning_rate,
        );

        let result = ConditionalGan::new(
            discriminator,
            generator,
            ImageShape::new(16, 16, 3),
            ImageShape::new(16, 16, 1),
            adam(&optimizer).init::<TestBackend, PatchDiscriminator<TestBackend>>(),
            adam(&optimizer).init::<TestBackend, UnetGenerator<TestBackend>>(),
            &optimizer,
            false,
            &device,
        );
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn test_composite_step_reports_both_heads() {
        let device = Default::default();
        let mut gan = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();

        let image = Tensor::full([2, 3, 16, 16], 0.5, &device);
        let condition = Tensor::ones([2, 1, 16, 16], &device);
        let labels = Tensor::zeros([2, 1, 1, 1], &device);
        let record = gan
            .train_step(image.clone(), condition, labels, image)
            .unwrap();

        assert_eq!(record.names(), vec!["loss", "validity_loss", "image_loss"]);
        let total = record.get("loss").unwrap();
        let parts = record.get("validity_loss").unwrap() + record.get("image_loss").unwrap();
        assert!((total - parts).abs() < 1e-5);
    }

    #[test]
    fn test_composite_step_updates_generator_and_discriminator() {
        let device = Default::default();
        let mut gan = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();
        let d_before = discriminator_head(gan.discriminator());
        let g_before = generator_output(gan.generator());

        let image = Tensor::random([2, 3, 16, 16], Distribution::Default, &device);
        gan.train_step(
            image.clone(),
            Tensor::random([2, 1, 16, 16], Distribution::Default, &device),
            Tensor::zeros([2, 1, 1, 1], &device),
            image,
        )
        .unwrap();

        assert_ne!(g_before, generator_output(gan.generator()));
        assert_ne!(d_before, discriminator_head(gan.discriminator()));
    }

    #[test]
    fn test_frozen_discriminator_is_untouched_by_composite() {
        let device = Default::default();
        let mut gan = build_cgan::<TestBackend>(&small_config(true), &device).unwrap();
        let d_before = discriminator_head(gan.discriminator());

        let image = Tensor::random([2, 3, 16, 16], Distribution::Default, &device);
        gan.train_step(
            image.clone(),
            Tensor::random([2, 1, 16, 16], Distribution::Default, &device),
            Tensor::zeros([2, 1, 1, 1], &device),
            image,
        )
        .unwrap();

        assert_eq!(d_before, discriminator_head(gan.discriminator()));
    }

    #[test]
    fn test_composite_rejects_wrong_image_input() {
        let device = Default::default();
        let mut gan = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();
        let result = gan.train_step(
            Tensor::zeros([1, 1, 16, 16], &device),
            Tensor::ones([1, 1, 16, 16], &device),
            Tensor::zeros([1, 1, 1, 1], &device),
            Tensor::zeros([1, 3, 16, 16], &device),
        );
        assert!(matches!(result, Err(Error::Shape(_))));
    }

    #[test]
    fn test_records_round_trip() {
        let device = Default::default();
        let dir = TempDir::new().unwrap();
        let mut trained = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();
        let image = Tensor::full([1, 3, 16, 16], 0.5, &device);
        trained
            .train_step(
                image.clone(),
                Tensor::ones([1, 1, 16, 16], &device),
                Tensor::zeros([1, 1, 1, 1], &device),
                image,
            )
            .unwrap();
        trained.save_records(dir.path()).unwrap();

        let mut restored = build_cgan::<TestBackend>(&small_config(false), &device).unwrap();
        restored.load_records(dir.path()).unwrap();

        let expected = generator_output(trained.generator());
        let actual = generator_output(restored.generator());
        assert_eq!(expected.len(), actual.len());
        // CompactRecorder stores half precision
        for (a, b) in expected.iter().zip(&actual) {
            assert!((a - b).abs() < 1e-2);
        }
    }
}
