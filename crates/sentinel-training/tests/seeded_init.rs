//! Weight initialisation under a fixed seed.
//!
//! Kept in its own test binary: the NdArray RNG is process-global, so tests
//! initialising modules on other threads would interleave with the draws.

use burn::backend::{Autodiff, NdArray};
use sentinel_core::{CganConfig, ImageShape, ModelConfig};
use sentinel_training::{build_cgan, CompositeModel};

type TestBackend = Autodiff<NdArray>;

fn config(seed: u64) -> CganConfig {
    let mut config = CganConfig {
        model: ModelConfig {
            input_shape: ImageShape::new(16, 16, 3),
            condition_shape: ImageShape::new(16, 16, 1),
            generator_filters: 4,
            discriminator_filters: 4,
            ..ModelConfig::default()
        },
        ..CganConfig::default()
    };
    config.training.seed = seed;
    config
}

fn initial_weights(seed: u64) -> (Vec<f32>, Vec<f32>) {
    let device = Default::default();
    let gan = build_cgan::<TestBackend>(&config(seed), &device).unwrap();
    let generator = gan.generator().module().output.weight.val();
    let discriminator = gan.discriminator().module().head.weight.val();
    (
        generator.into_data().to_vec::<f32>().unwrap(),
        discriminator.into_data().to_vec::<f32>().unwrap(),
    )
}

#[test]
fn test_same_seed_gives_same_initial_weights() {
    let first = initial_weights(42);
    let second = initial_weights(42);
    assert_eq!(first, second);

    let other = initial_weights(7);
    assert_ne!(first.0, other.0);
}
