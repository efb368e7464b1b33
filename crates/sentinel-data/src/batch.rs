//! Batches of paired satellite and condition tensors.

use burn::prelude::*;
use burn::tensor::TensorData;
use sentinel_core::{Error, ImageShape, Result};

/// A batch of satellite images paired with their mask/condition images.
///
/// Both tensors are NCHW. The leading dimensions must agree; that value is
/// the effective batch size.
#[derive(Clone, Debug)]
pub struct SentinelBatch<B: Backend> {
    /// Satellite images with shape [batch, C, H, W]
    pub images: Tensor<B, 4>,
    /// Condition images with shape [batch, C', H, W]
    pub conditions: Tensor<B, 4>,
}

impl<B: Backend> SentinelBatch<B> {
    pub fn new(images: Tensor<B, 4>, conditions: Tensor<B, 4>) -> Self {
        Self { images, conditions }
    }

    /// Builds a batch from flattened CHW samples
    pub fn from_samples(
        images: &[Vec<f32>],
        conditions: &[Vec<f32>],
        input_shape: ImageShape,
        condition_shape: ImageShape,
        device: &B::Device,
    ) -> Result<Self> {
        if images.len() != conditions.len() {
            return Err(Error::Shape(format!(
                "{} satellite images but {} conditions",
                images.len(),
                conditions.len()
            )));
        }
        let images = stack_samples::<B>(images, input_shape, device)?;
        let conditions = stack_samples::<B>(conditions, condition_shape, device)?;
        Ok(Self { images, conditions })
    }

    /// Effective batch size.
    ///
    /// Fails when the image and condition batches have different lengths.
    pub fn len(&self) -> Result<usize> {
        let [images, ..] = self.images.dims();
        let [conditions, ..] = self.conditions.dims();
        if images != conditions {
            return Err(Error::Shape(format!(
                "batch has {images} satellite images but {conditions} conditions"
            )));
        }
        Ok(images)
    }
}

/// Stacks flattened CHW samples into one NCHW tensor
fn stack_samples<B: Backend>(
    samples: &[Vec<f32>],
    shape: ImageShape,
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    let expected = shape.num_elements();
    let mut data = Vec::with_capacity(samples.len() * expected);
    for (i, sample) in samples.iter().enumerate() {
        if sample.len() != expected {
            return Err(Error::Shape(format!(
                "sample {i} has {} values, expected {expected} for shape {shape}",
                sample.len()
            )));
        }
        data.extend_from_slice(sample);
    }
    Ok(Tensor::from_data(
        TensorData::new(data, shape.nchw(samples.len())),
        device,
    ))
}
