//! Burn network architectures for the Sentinel cGAN.
//!
//! - [`PatchDiscriminator`]: four stride-2 stages, validity map at H/16 × W/16
//! - [`UnetGenerator`]: four-level encoder/decoder with skip connections

pub mod blocks;
pub mod discriminator;
pub mod generator;

pub use discriminator::{PatchDiscriminator, PatchDiscriminatorConfig};
pub use generator::{UnetGenerator, UnetGeneratorConfig};
