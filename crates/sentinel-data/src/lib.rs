//! Paired satellite/mask dataset loading for the Sentinel cGAN.
//!
//! This crate provides the data generator capability consumed by the
//! trainer, a directory-backed implementation and an in-memory one.

pub mod batch;
pub mod source;
pub mod loader;
pub mod dataset;
pub mod memory;

pub use batch::SentinelBatch;
pub use dataset::SentinelDataGenerator;
pub use loader::{load_image_chw, scan_pairs, SamplePair};
pub use memory::InMemoryDataGenerator;
pub use source::{batch_count, DataGenerator};
