//! Capability traits for the trainable networks.
//!
//! The trainer only sees these traits. The Burn types in [`crate::adapter`]
//! and [`crate::composite`] implement them; tests implement them with
//! recording doubles.

use burn::prelude::*;
use sentinel_core::{LossRecord, Result};

/// Maps `(image, condition)` to a validity score map.
pub trait Discriminator<B: Backend> {
    /// Forward pass without a weight update
    fn predict(&self, image: Tensor<B, 4>, condition: Tensor<B, 4>) -> Tensor<B, 4>;

    /// One supervised weight update towards `target`
    fn train_step(
        &mut self,
        image: Tensor<B, 4>,
        condition: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> Result<LossRecord>;
}

/// Maps a condition to a synthetic image.
pub trait Generator<B: Backend> {
    /// Forward pass without a weight update
    fn predict(&self, condition: Tensor<B, 4>) -> Tensor<B, 4>;

    /// One supervised weight update towards `target`
    fn train_step(&mut self, condition: Tensor<B, 4>, target: Tensor<B, 4>) -> Result<LossRecord>;
}

/// Generator output wired into the discriminator, trained jointly.
///
/// The composite owns both networks, so the trainer reaches them through it.
pub trait CompositeModel<B: Backend> {
    type Discriminator: Discriminator<B>;
    type Generator: Generator<B>;

    fn discriminator(&self) -> &Self::Discriminator;

    fn discriminator_mut(&mut self) -> &mut Self::Discriminator;

    fn generator(&self) -> &Self::Generator;

    fn generator_mut(&mut self) -> &mut Self::Generator;

    /// One joint update with targets for both outputs `(validity, image)`
    fn train_step(
        &mut self,
        image: Tensor<B, 4>,
        condition: Tensor<B, 4>,
        validity_target: Tensor<B, 4>,
        image_target: Tensor<B, 4>,
    ) -> Result<LossRecord>;
}
