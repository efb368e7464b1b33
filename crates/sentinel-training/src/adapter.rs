//! Burn bindings of the network capabilities.
//!
//! Each adapter owns its module and its own optimizer. Optimizers are
//! built from an explicit [`OptimizerConfig`], one instance per network.

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use sentinel_core::{DiscriminatorLoss, LossRecord, OptimizerConfig, Result};
use tracing::trace;

use crate::loss::{binary_cross_entropy, ensure_same_dims, mean_squared_error, scalar};
use crate::model::{PatchDiscriminator, UnetGenerator};
use crate::network::{Discriminator, Generator};

/// Adam configured from `config`
pub fn adam(config: &OptimizerConfig) -> AdamConfig {
    AdamConfig::new()
        .with_beta_1(config.beta_1)
        .with_beta_2(config.beta_2)
        .with_epsilon(config.epsilon)
}

/// Trainable PatchDiscriminator
pub struct BurnDiscriminator<B: AutodiffBackend, O> {
    pub(crate) module: PatchDiscriminator<B>,
    optim: O,
    learning_rate: f64,
    loss: DiscriminatorLoss,
}

impl<B, O> BurnDiscriminator<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<PatchDiscriminator<B>, B>,
{
    pub fn new(module: PatchDiscriminator<B>, optim: O, learning_rate: f64, loss: DiscriminatorLoss) -> Self {
        Self {
            module,
            optim,
            learning_rate,
            loss,
        }
    }

    pub fn module(&self) -> &PatchDiscriminator<B> {
        &self.module
    }
}

impl<B, O> Discriminator<B> for BurnDiscriminator<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<PatchDiscriminator<B>, B>,
{
    fn predict(&self, image: Tensor<B, 4>, condition: Tensor<B, 4>) -> Tensor<B, 4> {
        let validity = self.module.valid().forward(image.inner(), condition.inner());
        Tensor::from_inner(validity)
    }

    fn train_step(
        &mut self,
        image: Tensor<B, 4>,
        condition: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> Result<LossRecord> {
        let validity = self.module.forward(image, condition);
        ensure_same_dims(&validity, &target, "discriminator")?;

        let loss = match self.loss {
            DiscriminatorLoss::Mse => mean_squared_error(validity, target),
            DiscriminatorLoss::Bce => binary_cross_entropy(validity, target),
        };
        let value = scalar(&loss);

        let grads = GradientsParams::from_grads(loss.backward(), &self.module);
        self.module = self.optim.step(self.learning_rate, self.module.clone(), grads);

        trace!("discriminator step loss={value:.6}");
        Ok(LossRecord::single("loss", value))
    }
}

/// Trainable UnetGenerator
pub struct BurnGenerator<B: AutodiffBackend, O> {
    pub(crate) module: UnetGenerator<B>,
    optim: O,
    learning_rate: f64,
}

impl<B, O> BurnGenerator<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<UnetGenerator<B>, B>,
{
    pub fn new(module: UnetGenerator<B>, optim: O, learning_rate: f64) -> Self {
        Self {
            module,
            optim,
            learning_rate,
        }
    }

    pub fn module(&self) -> &UnetGenerator<B> {
        &self.module
    }
}

impl<B, O> Generator<B> for BurnGenerator<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<UnetGenerator<B>, B>,
{
    fn predict(&self, condition: Tensor<B, 4>) -> Tensor<B, 4> {
        let image = self.module.valid().forward(condition.inner());
        Tensor::from_inner(image)
    }

    /// Supervised reconstruction step (mean squared error to `target`)
    fn train_step(&mut self, condition: Tensor<B, 4>, target: Tensor<B, 4>) -> Result<LossRecord> {
        let image = self.module.forward(condition);
        ensure_same_dims(&image, &target, "generator")?;

        let loss = mean_squared_error(image, target);
        let value = scalar(&loss);

        let grads = GradientsParams::from_grads(loss.backward(), &self.module);
        self.module = self.optim.step(self.learning_rate, self.module.clone(), grads);

        trace!("generator step loss={value:.6}");
        Ok(LossRecord::single("loss", value))
    }
}
