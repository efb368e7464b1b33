//! Directory-backed data generator.

use burn::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sentinel_core::{DataConfig, Error, ImageShape, Result};
use tracing::info;

use crate::loader::{load_image_chw, scan_pairs, SamplePair};
use crate::source::{BatchIter, DataGenerator};
use crate::SentinelBatch;

/// Paired satellite/mask dataset read from disk.
///
/// Images are decoded lazily, one batch at a time.
pub struct SentinelDataGenerator<B: Backend> {
    pairs: Vec<SamplePair>,
    input_shape: ImageShape,
    condition_shape: ImageShape,
    shuffle: bool,
    rng: ChaCha8Rng,
    device: B::Device,
}

impl<B: Backend> SentinelDataGenerator<B> {
    /// Creates a generator over already discovered pairs
    pub fn new(
        pairs: Vec<SamplePair>,
        input_shape: ImageShape,
        condition_shape: ImageShape,
        device: B::Device,
    ) -> Self {
        Self {
            pairs,
            input_shape,
            condition_shape,
            shuffle: false,
            rng: ChaCha8Rng::seed_from_u64(0),
            device,
        }
    }

    /// Scans `config.data_dir` for pairs
    pub fn from_config(
        config: &DataConfig,
        input_shape: ImageShape,
        condition_shape: ImageShape,
        seed: u64,
        device: B::Device,
    ) -> Result<Self> {
        let pairs = scan_pairs(&config.data_dir, &config.satellite_dir, &config.mask_dir)?;
        info!(
            "Loaded {} satellite/mask pairs from {}",
            pairs.len(),
            config.data_dir.display()
        );
        Ok(Self::new(pairs, input_shape, condition_shape, device).with_shuffle(config.shuffle, seed))
    }

    /// Shuffle pair order at the start of every pass
    pub fn with_shuffle(mut self, shuffle: bool, seed: u64) -> Self {
        self.shuffle = shuffle;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    /// Decodes the first `count` pairs in their current order.
    ///
    /// Does not start a pass, so the shuffle sequence seen by training is
    /// the same whether or not a preview was taken.
    pub fn preview(&self, count: usize) -> Result<SentinelBatch<B>> {
        let take = count.min(self.pairs.len());
        if take == 0 {
            return Err(Error::Dataset("no pairs to preview".into()));
        }
        self.load_batch(&self.pairs[..take])
    }

    fn load_batch(&self, chunk: &[SamplePair]) -> Result<SentinelBatch<B>> {
        let mut images = Vec::with_capacity(chunk.len());
        let mut conditions = Vec::with_capacity(chunk.len());
        for pair in chunk {
            images.push(load_image_chw(&pair.satellite, self.input_shape)?);
            conditions.push(load_image_chw(&pair.mask, self.condition_shape)?);
        }
        SentinelBatch::from_samples(
            &images,
            &conditions,
            self.input_shape,
            self.condition_shape,
            &self.device,
        )
    }
}

impl<B: Backend> DataGenerator<B> for SentinelDataGenerator<B> {
    fn example_count(&self) -> usize {
        self.pairs.len()
    }

    fn load(&mut self, batch_size: usize) -> Result<BatchIter<'_, B>> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be greater than 0".into()));
        }
        if self.shuffle {
            self.pairs.shuffle(&mut self.rng);
        }

        let this = &*self;
        Ok(Box::new(
            this.pairs
                .chunks(batch_size)
                .map(move |chunk| this.load_batch(chunk)),
        ))
    }
}
