//! Adversarial training loop.
//!
//! Per batch: generator inference on the conditions, a discriminator update on
//! real pairs, a discriminator update on synthetic pairs, then one composite
//! update that pushes the generator. The plotter runs once per epoch.

use burn::prelude::*;
use sentinel_core::{Error, ImageShape, LossAccumulator, LossRecord, PixelRange, Result};
use sentinel_data::{DataGenerator, SentinelBatch};
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::history::{EpochSummary, TrainingHistory};
use crate::network::{CompositeModel, Discriminator, Generator};
use crate::plot::Plotter;
use crate::progress::{StepReport, TrainingObserver};

/// Drives the cGAN over a data generator.
///
/// The trainer exclusively owns the composite model, and through it both
/// networks, for the whole run.
pub struct Trainer<B: Backend, M, D, P> {
    model: M,
    data: D,
    plotter: P,
    input_shape: ImageShape,
    observers: Vec<Box<dyn TrainingObserver>>,
    _backend: PhantomData<B>,
}

impl<B, M, D, P> Trainer<B, M, D, P>
where
    B: Backend,
    M: CompositeModel<B>,
    D: DataGenerator<B>,
    P: Plotter<B>,
{
    /// `input_shape` fixes the label spatial dims for the whole run
    pub fn new(model: M, data: D, plotter: P, input_shape: ImageShape) -> Self {
        Self {
            model,
            data,
            plotter,
            input_shape,
            observers: Vec::new(),
            _backend: PhantomData,
        }
    }

    pub fn with_observer(mut self, observer: impl TrainingObserver + 'static) -> Self {
        self.add_observer(observer);
        self
    }

    pub fn add_observer(&mut self, observer: impl TrainingObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Runs epochs `1..=epochs`
    pub fn train(&mut self, epochs: usize, batch_size: usize, pixel_range: PixelRange) -> Result<TrainingHistory> {
        info!(
            "Training for {} epochs, batch size {}, labels fake={} real={}",
            epochs,
            batch_size,
            pixel_range.fake(),
            pixel_range.real()
        );
        let mut history = TrainingHistory::new();
        for epoch in 1..=epochs {
            history.push(self.train_epoch(epoch, epochs, batch_size, pixel_range)?);
        }
        Ok(history)
    }

    /// One full pass over the data generator followed by a plot.
    ///
    /// `epoch` is 1-based and is what the plotter receives.
    pub fn train_epoch(
        &mut self,
        epoch: usize,
        epochs: usize,
        batch_size: usize,
        pixel_range: PixelRange,
    ) -> Result<EpochSummary> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be greater than 0".into()));
        }

        let started = Instant::now();
        let example_count = self.data.example_count();
        for observer in self.observers.iter_mut() {
            observer.on_epoch_start(epoch, epochs, example_count);
        }

        let mut discriminator_mean = LossAccumulator::new();
        let mut composite_mean = LossAccumulator::new();
        let mut examples = 0;

        for (step, batch) in self.data.load(batch_size)?.enumerate() {
            let (effective, discriminator, composite) =
                adversarial_step(&mut self.model, batch?, self.input_shape, pixel_range)?;

            if !discriminator.is_finite() || !composite.is_finite() {
                warn!(
                    "Non-finite loss at epoch {} step {}: d[{}] g[{}]",
                    epoch, step, discriminator, composite
                );
            }
            discriminator_mean.push(&discriminator)?;
            composite_mean.push(&composite)?;
            examples += effective;

            let report = StepReport {
                epoch,
                step,
                batch_size: effective,
                discriminator,
                composite,
            };
            for observer in self.observers.iter_mut() {
                observer.on_step(&report);
            }
        }

        if let Err(e) = self.plotter.plot(self.model.generator(), epoch) {
            warn!("Plotting epoch {} failed: {}", epoch, e);
        }

        let summary = EpochSummary {
            epoch,
            steps: composite_mean.count(),
            examples,
            discriminator: discriminator_mean.mean(),
            composite: composite_mean.mean(),
            duration_secs: started.elapsed().as_secs_f64(),
        };
        for observer in self.observers.iter_mut() {
            observer.on_epoch_end(&summary);
        }
        Ok(summary)
    }
}

/// One iteration: two discriminator updates, then one composite update.
///
/// Returns the effective batch size, the averaged discriminator record and
/// the composite record.
fn adversarial_step<B, M>(
    model: &mut M,
    batch: SentinelBatch<B>,
    input_shape: ImageShape,
    pixel_range: PixelRange,
) -> Result<(usize, LossRecord, LossRecord)>
where
    B: Backend,
    M: CompositeModel<B>,
{
    let batch_size = batch.len()?;
    let SentinelBatch { images, conditions } = batch;
    let device = images.device();

    let label_dims = input_shape.label_shape(batch_size).nchw();
    let fake_labels = Tensor::<B, 4>::full(label_dims, pixel_range.fake(), &device);
    let real_labels = Tensor::<B, 4>::full(label_dims, pixel_range.real(), &device);

    let synthetic = model.generator().predict(conditions.clone());

    let real = model
        .discriminator_mut()
        .train_step(images.clone(), conditions.clone(), real_labels)?;
    let fake = model
        .discriminator_mut()
        .train_step(synthetic, conditions.clone(), fake_labels.clone())?;
    let discriminator = real.average(&fake)?;

    let composite = model.train_step(images.clone(), conditions, fake_labels, images)?;

    debug!("batch {}: d[{}] g[{}]", batch_size, discriminator, composite);
    Ok((batch_size, discriminator, composite))
}
