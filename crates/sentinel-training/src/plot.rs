//! Per-epoch sample plots.
//!
//! [`ImagePlotter`] keeps a fixed set of conditions and their satellite
//! targets and, after each epoch, renders one PNG with a row per sample:
//! condition, generated image, satellite image.

use burn::prelude::*;
use image::{imageops, Rgb, RgbImage};
use sentinel_core::{Error, Result};
use sentinel_data::DataGenerator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::network::Generator;

/// Called once per epoch with the current generator
pub trait Plotter<B: Backend> {
    fn plot<G: Generator<B>>(&mut self, generator: &G, epoch: usize) -> Result<()>;
}

/// Plotter that writes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlotter;

impl<B: Backend> Plotter<B> for NoopPlotter {
    fn plot<G: Generator<B>>(&mut self, _generator: &G, _epoch: usize) -> Result<()> {
        Ok(())
    }
}

pub struct ImagePlotter<B: Backend> {
    conditions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    output_dir: PathBuf,
}

impl<B: Backend> ImagePlotter<B> {
    pub fn new(conditions: Tensor<B, 4>, targets: Tensor<B, 4>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let [n_conditions, _, h, w] = conditions.dims();
        let [n_targets, _, th, tw] = targets.dims();
        if n_conditions != n_targets || (h, w) != (th, tw) {
            return Err(Error::Shape(format!(
                "plot samples disagree: conditions {:?} targets {:?}",
                conditions.dims(),
                targets.dims()
            )));
        }
        Ok(Self {
            conditions,
            targets,
            output_dir: output_dir.into(),
        })
    }

    /// Takes up to `samples` examples from the first batch of a fresh pass.
    ///
    /// This consumes one call to `load`, so a shuffling generator advances
    /// its order as if an epoch had started.
    pub fn from_data_generator<D: DataGenerator<B>>(
        data: &mut D,
        samples: usize,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let batch = data
            .load(samples.max(1))?
            .next()
            .ok_or_else(|| Error::Dataset("no samples available for plotting".into()))??;
        Self::new(batch.conditions, batch.images, output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the plot written for `epoch`
    pub fn plot_path(&self, epoch: usize) -> PathBuf {
        self.output_dir.join(format!("epoch_{:03}.png", epoch))
    }
}

impl<B: Backend> Plotter<B> for ImagePlotter<B> {
    fn plot<G: Generator<B>>(&mut self, generator: &G, epoch: usize) -> Result<()> {
        let generated = generator.predict(self.conditions.clone());

        let rows: Vec<[RgbImage; 3]> = tensor_to_rgb_images(self.conditions.clone())?
            .into_iter()
            .zip(tensor_to_rgb_images(generated)?)
            .zip(tensor_to_rgb_images(self.targets.clone())?)
            .map(|((c, g), t)| [c, g, t])
            .collect();

        let Some(first) = rows.first() else {
            return Ok(());
        };
        let (w, h) = first[0].dimensions();
        let mut grid = RgbImage::new(w * 3, h * rows.len() as u32);
        for (row, images) in rows.iter().enumerate() {
            for (col, image) in images.iter().enumerate() {
                imageops::replace(&mut grid, image, (col as u32 * w) as i64, (row as u32 * h) as i64);
            }
        }

        fs::create_dir_all(&self.output_dir)?;
        let path = self.plot_path(epoch);
        grid.save(&path)?;
        debug!("Saved sample plot {:?}", path);
        Ok(())
    }
}

/// Converts an NCHW batch with 1 or 3 channels in `[0, 1]` to RGB images
pub fn tensor_to_rgb_images<B: Backend>(tensor: Tensor<B, 4>) -> Result<Vec<RgbImage>> {
    let [n, c, h, w] = tensor.dims();
    if c != 1 && c != 3 {
        return Err(Error::InvalidArgument(format!("cannot plot {c}-channel images")));
    }
    let values = tensor
        .clamp(0.0, 1.0)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Other(format!("tensor readback failed: {e:?}")))?;

    let plane = h * w;
    let to_u8 = |v: f32| (v * 255.0).round() as u8;
    Ok((0..n)
        .map(|i| {
            let sample = &values[i * c * plane..(i + 1) * c * plane];
            RgbImage::from_fn(w as u32, h as u32, |x, y| {
                let p = y as usize * w + x as usize;
                if c == 1 {
                    let v = to_u8(sample[p]);
                    Rgb([v, v, v])
                } else {
                    Rgb([to_u8(sample[p]), to_u8(sample[plane + p]), to_u8(sample[2 * plane + p])])
                }
            })
        })
        .collect())
}
