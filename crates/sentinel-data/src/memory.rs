//! In-memory data generator over pre-decoded samples.

use burn::prelude::*;
use sentinel_core::{Error, ImageShape, Result};

use crate::source::{BatchIter, DataGenerator};
use crate::SentinelBatch;

/// Holds flattened CHW `(satellite, condition)` samples in memory.
pub struct InMemoryDataGenerator<B: Backend> {
    images: Vec<Vec<f32>>,
    conditions: Vec<Vec<f32>>,
    input_shape: ImageShape,
    condition_shape: ImageShape,
    device: B::Device,
}

impl<B: Backend> InMemoryDataGenerator<B> {
    pub fn new(
        images: Vec<Vec<f32>>,
        conditions: Vec<Vec<f32>>,
        input_shape: ImageShape,
        condition_shape: ImageShape,
        device: B::Device,
    ) -> Result<Self> {
        if images.len() != conditions.len() {
            return Err(Error::Dataset(format!(
                "{} satellite samples but {} conditions",
                images.len(),
                conditions.len()
            )));
        }
        Ok(Self {
            images,
            conditions,
            input_shape,
            condition_shape,
            device,
        })
    }

    /// `count` samples with every image filled with `image_value` and every
    /// condition with `condition_value`
    pub fn constant(
        count: usize,
        input_shape: ImageShape,
        condition_shape: ImageShape,
        image_value: f32,
        condition_value: f32,
        device: B::Device,
    ) -> Self {
        Self {
            images: vec![vec![image_value; input_shape.num_elements()]; count],
            conditions: vec![vec![condition_value; condition_shape.num_elements()]; count],
            input_shape,
            condition_shape,
            device,
        }
    }
}

impl<B: Backend> DataGenerator<B> for InMemoryDataGenerator<B> {
    fn example_count(&self) -> usize {
        self.images.len()
    }

    fn load(&mut self, batch_size: usize) -> Result<BatchIter<'_, B>> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be greater than 0".into()));
        }

        let this = &*self;
        Ok(Box::new(
            this.images
                .chunks(batch_size)
                .zip(this.conditions.chunks(batch_size))
                .map(move |(images, conditions)| {
                    SentinelBatch::from_samples(
                        images,
                        conditions,
                        this.input_shape,
                        this.condition_shape,
                        &this.device,
                    )
                }),
        ))
    }
}
