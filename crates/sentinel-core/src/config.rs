//! Configuration structures for the Sentinel cGAN.

use crate::types::{ImageShape, PixelRange, DISCRIMINATOR_DOWNSAMPLING};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a cGAN training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CganConfig {
    /// Network configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Optimizer hyperparameters
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Training loop parameters
    #[serde(default)]
    pub training: TrainingParams,
    /// Dataset configuration
    #[serde(default)]
    pub data: DataConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for CganConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            optimizer: OptimizerConfig::default(),
            training: TrainingParams::default(),
            data: DataConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl CganConfig {
    /// Checks the configuration for values the networks or loop cannot handle
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.optimizer.validate()?;

        if self.training.epochs == 0 {
            return Err(Error::Config("Number of epochs must be greater than 0".into()));
        }
        if self.training.batch_size == 0 {
            return Err(Error::Config("Batch size must be greater than 0".into()));
        }
        if self.output.save_every == 0 {
            return Err(Error::Config("save_every must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Loss used by the discriminator's own update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorLoss {
    /// Mean squared error against the label map
    #[default]
    Mse,
    /// Binary cross-entropy against the label map
    Bce,
}

impl std::fmt::Display for DiscriminatorLoss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscriminatorLoss::Mse => write!(f, "mse"),
            DiscriminatorLoss::Bce => write!(f, "bce"),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Shape of the satellite image the generator reconstructs
    pub input_shape: ImageShape,
    /// Shape of the mask/condition image
    pub condition_shape: ImageShape,
    /// Base number of generator filters
    #[serde(default = "default_filters")]
    pub generator_filters: usize,
    /// Base number of discriminator filters
    #[serde(default = "default_filters")]
    pub discriminator_filters: usize,
    /// Loss for the discriminator's own update
    #[serde(default)]
    pub discriminator_loss: DiscriminatorLoss,
    /// Restrict the composite update to generator weights
    #[serde(default)]
    pub freeze_discriminator: bool,
}

fn default_filters() -> usize {
    16
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_shape: ImageShape::new(256, 256, 3),
            condition_shape: ImageShape::new(256, 256, 1),
            generator_filters: default_filters(),
            discriminator_filters: default_filters(),
            discriminator_loss: DiscriminatorLoss::default(),
            freeze_discriminator: false,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, shape) in [("input_shape", self.input_shape), ("condition_shape", self.condition_shape)] {
            if shape.height == 0 || shape.width == 0 {
                return Err(Error::Config(format!("{name} must have non-zero spatial dims, got {shape}")));
            }
            if !matches!(shape.channels, 1 | 3) {
                return Err(Error::Config(format!(
                    "{name} must have 1 or 3 channels, got {}",
                    shape.channels
                )));
            }
            if !shape.is_downsampling_aligned() {
                return Err(Error::Config(format!(
                    "{name} spatial dims must be multiples of {DISCRIMINATOR_DOWNSAMPLING}, got {shape}"
                )));
            }
        }
        if (self.input_shape.height, self.input_shape.width)
            != (self.condition_shape.height, self.condition_shape.width)
        {
            return Err(Error::Config(format!(
                "input_shape {} and condition_shape {} must share spatial dims",
                self.input_shape, self.condition_shape
            )));
        }
        if self.generator_filters == 0 || self.discriminator_filters == 0 {
            return Err(Error::Config("Filter counts must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Adam hyperparameters.
///
/// Every network builds its own optimizer from this value, so no optimizer
/// state is shared between networks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    pub learning_rate: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.0005,
            beta_1: 0.5,
            beta_2: 0.999,
            epsilon: 1e-7,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 {
            return Err(Error::Config("Learning rate must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.beta_1) || !(0.0..1.0).contains(&self.beta_2) {
            return Err(Error::Config("Adam betas must lie in [0, 1)".into()));
        }
        Ok(())
    }
}

/// Training loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of passes over the dataset
    pub epochs: usize,
    /// Requested batch size (the final batch may be shorter)
    pub batch_size: usize,
    /// Label values for fake and real batches
    #[serde(default)]
    pub pixel_range: PixelRange,
    /// Random seed for shuffling and weight initialisation
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 1,
            pixel_range: PixelRange::default(),
            seed: default_seed(),
        }
    }
}

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory holding the satellite and mask folders
    pub data_dir: PathBuf,
    /// Satellite image folder, relative to `data_dir`
    #[serde(default = "default_satellite_dir")]
    pub satellite_dir: String,
    /// Mask image folder, relative to `data_dir`
    #[serde(default = "default_mask_dir")]
    pub mask_dir: String,
    /// Shuffle sample order at the start of every pass
    #[serde(default)]
    pub shuffle: bool,
}

fn default_satellite_dir() -> String {
    "satellite".to_string()
}

fn default_mask_dir() -> String {
    "mask".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/sentinel"),
            satellite_dir: default_satellite_dir(),
            mask_dir: default_mask_dir(),
            shuffle: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for plots, checkpoints and metrics
    pub output_dir: PathBuf,
    /// Render generator samples after every epoch
    #[serde(default = "default_true")]
    pub plot: bool,
    /// Number of samples per plot
    #[serde(default = "default_plot_samples")]
    pub plot_samples: usize,
    /// Checkpoint frequency in epochs
    #[serde(default = "default_save_every")]
    pub save_every: usize,
    /// Number of checkpoints to retain
    #[serde(default = "default_keep_last")]
    pub keep_last: usize,
    /// Export per-epoch metrics to CSV
    #[serde(default = "default_true")]
    pub export_csv: bool,
}

fn default_true() -> bool {
    true
}

fn default_plot_samples() -> usize {
    4
}

fn default_save_every() -> usize {
    1
}

fn default_keep_last() -> usize {
    3
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            plot: true,
            plot_samples: default_plot_samples(),
            save_every: default_save_every(),
            keep_last: default_keep_last(),
            export_csv: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CganConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 1);
        assert_eq!(config.training.pixel_range, PixelRange::new(0.0, 1.0));
    }

    #[test]
    fn test_default_optimizer() {
        let optimizer = OptimizerConfig::default();
        assert_eq!(optimizer.learning_rate, 0.0005);
        assert_eq!(optimizer.beta_1, 0.5);
    }

    #[test]
    fn test_rejects_zero_epochs_and_batch() {
        let mut config = CganConfig::default();
        config.training.epochs = 0;
        assert!(config.validate().is_err());

        let mut config = CganConfig::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unaligned_shape() {
        let mut config = CganConfig::default();
        config.model.input_shape = ImageShape::new(100, 100, 3);
        config.model.condition_shape = ImageShape::new(100, 100, 1);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_mismatched_spatial_dims() {
        let mut config = CganConfig::default();
        config.model.condition_shape = ImageShape::new(128, 128, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_learning_rate() {
        let mut config = CganConfig::default();
        config.optimizer.learning_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_with_defaults() {
        let toml_str = r#"
            [model]
            input_shape = { height = 64, width = 64, channels = 3 }
            condition_shape = { height = 64, width = 64, channels = 1 }
            discriminator_loss = "bce"

            [training]
            epochs = 2
            batch_size = 4
            pixel_range = { low = 1.0, high = 0.0 }

            [data]
            data_dir = "/data/sentinel"

            [output]
            output_dir = "/tmp/out"
        "#;

        let config: CganConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.discriminator_loss, DiscriminatorLoss::Bce);
        assert_eq!(config.model.generator_filters, 16);
        assert_eq!(config.training.pixel_range.fake(), 1.0);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.data.mask_dir, "mask");
        assert_eq!(config.optimizer, OptimizerConfig::default());
        assert!(config.validate().is_ok());
    }
}
