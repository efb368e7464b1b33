//! Adversarial training for the Sentinel satellite-reconstruction cGAN.
//!
//! This crate provides:
//! - Capability traits for the discriminator, generator and composite model
//! - Burn implementations (PatchGAN discriminator, U-Net generator)
//! - The adversarial trainer and its progress observers
//! - Per-epoch sample plotting, training history and checkpoints

pub mod network;
pub mod model;
pub mod loss;
pub mod adapter;
pub mod composite;
pub mod trainer;
pub mod progress;
pub mod plot;
pub mod history;
pub mod checkpoint;

pub use adapter::{BurnDiscriminator, BurnGenerator};
pub use checkpoint::{Checkpoint, CheckpointManager, Checkpointable};
pub use composite::{build_cgan, ConditionalGan};
pub use history::{EpochSummary, TrainingHistory};
pub use model::{PatchDiscriminator, PatchDiscriminatorConfig, UnetGenerator, UnetGeneratorConfig};
pub use network::{CompositeModel, Discriminator, Generator};
pub use plot::{ImagePlotter, NoopPlotter, Plotter};
pub use progress::{LoggingObserver, ProgressBarObserver, StepReport, TrainingObserver};
pub use trainer::Trainer;

/// Re-export commonly used types
pub mod prelude {
    pub use super::composite::{build_cgan, ConditionalGan};
    pub use super::network::{CompositeModel, Discriminator, Generator};
    pub use super::plot::{ImagePlotter, NoopPlotter, Plotter};
    pub use super::progress::{LoggingObserver, ProgressBarObserver, TrainingObserver};
    pub use super::trainer::Trainer;
}
