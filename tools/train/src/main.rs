//! Sentinel cGAN training CLI
//!
//! Trains the satellite-reconstruction cGAN on `(satellite, mask)` image pairs
//! and writes sample plots, checkpoints and loss history to the output
//! directory.

mod backend;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use colored::Colorize;
use sentinel_core::{load_toml_config, setup_cli_logging, CganConfig};
use sentinel_data::{DataGenerator, SentinelDataGenerator};
use sentinel_training::{
    build_cgan, Checkpoint, CheckpointManager, Checkpointable, CompositeModel, ImagePlotter,
    LoggingObserver, NoopPlotter, Plotter, ProgressBarObserver, Trainer, TrainingHistory,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use backend::{backend_name, default_device, TrainingBackend};

/// Sentinel satellite-reconstruction cGAN trainer
#[derive(Parser, Debug)]
#[command(
    name = "sentinel-train",
    about = "Train the Sentinel satellite-reconstruction cGAN",
    long_about = "Adversarially trains a mask-conditioned generator against a patch \
                  discriminator on paired satellite and mask images."
)]
struct Args {
    /// Path to training configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override number of epochs
    #[arg(short, long, value_name = "N")]
    epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long, value_name = "SIZE")]
    batch_size: Option<usize>,

    /// Override learning rate
    #[arg(short, long, value_name = "LR")]
    lr: Option<f64>,

    /// Override output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Override dataset root directory
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Resume from the latest checkpoint in this directory
    #[arg(short, long, value_name = "DIR")]
    resume: Option<PathBuf>,

    /// Validate configuration without training
    #[arg(long)]
    dry_run: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_cli_logging(args.verbose)?;

    println!("{}", "Sentinel cGAN - Training Tool".green().bold());

    let mut config: CganConfig =
        load_toml_config(&args.config).context("Failed to load configuration file")?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    print_config_summary(&config);

    if args.dry_run {
        info!("Configuration validated successfully (dry run)");
        return Ok(());
    }

    std::fs::create_dir_all(&config.output.output_dir).context("Failed to create output directory")?;
    let config_path = config.output.output_dir.join("config.toml");
    std::fs::write(&config_path, toml::to_string_pretty(&config)?).context("Failed to save configuration")?;
    info!("Configuration saved to: {}", config_path.display());

    let history = run_training::<TrainingBackend>(
        &config,
        args.resume.as_deref(),
        !args.no_progress,
        default_device(),
    )?;

    if let Some(last) = history.last() {
        println!(
            "{} epoch {}: d[{}] g[{}]",
            "Training completed".green().bold(),
            last.epoch,
            last.discriminator,
            last.composite
        );
    } else {
        println!("{}", "Nothing to train: all epochs already completed".yellow());
    }
    Ok(())
}

fn apply_overrides(config: &mut CganConfig, args: &Args) {
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.training.batch_size = batch_size;
    }
    if let Some(lr) = args.lr {
        config.optimizer.learning_rate = lr;
    }
    if let Some(ref output) = args.output {
        config.output.output_dir = output.clone();
    }
    if let Some(ref data_dir) = args.data_dir {
        config.data.data_dir = data_dir.clone();
    }
}

fn print_config_summary(config: &CganConfig) {
    info!("Configuration Summary:");
    info!("  Backend: {}", backend_name());
    info!("  Input shape: {}", config.model.input_shape);
    info!("  Condition shape: {}", config.model.condition_shape);
    info!("  Discriminator loss: {}", config.model.discriminator_loss);
    info!("  Freeze discriminator in composite: {}", config.model.freeze_discriminator);
    info!("  Epochs: {}", config.training.epochs);
    info!("  Batch size: {}", config.training.batch_size);
    info!("  Learning rate: {}", config.optimizer.learning_rate);
    info!("  Pixel range: {}", config.training.pixel_range);
    info!("  Data dir: {}", config.data.data_dir.display());
    info!("  Output dir: {}", config.output.output_dir.display());
}

/// Builds data, model and plotter, then trains and exports the history
fn run_training<B: AutodiffBackend>(
    config: &CganConfig,
    resume: Option<&Path>,
    progress: bool,
    device: B::Device,
) -> Result<TrainingHistory> {
    let model_config = &config.model;
    let output_dir = &config.output.output_dir;

    let data = SentinelDataGenerator::<B>::from_config(
        &config.data,
        model_config.input_shape,
        model_config.condition_shape,
        config.training.seed,
        device.clone(),
    )
    .context("Failed to scan dataset")?;
    if data.example_count() == 0 {
        warn!("No satellite/mask pairs found; epochs will run without updates");
    }

    let mut model = build_cgan::<B>(config, &device).context("Failed to build cGAN")?;

    let mut start_epoch = 1;
    let mut history = TrainingHistory::new();
    if let Some(dir) = resume {
        let checkpoint = CheckpointManager::new(dir.to_path_buf())
            .restore_latest(&mut model)
            .with_context(|| format!("Failed to resume from {}", dir.display()))?;
        info!("Resumed from epoch {}", checkpoint.epoch);
        start_epoch = checkpoint.epoch + 1;

        let history_path = output_dir.join("history.json");
        if history_path.exists() {
            history = TrainingHistory::load_json(&history_path)?;
            history.epochs.retain(|e| e.epoch <= checkpoint.epoch);
        }
    }

    if config.output.plot && data.example_count() > 0 {
        let samples = data
            .preview(config.output.plot_samples.max(1))
            .context("Failed to prepare sample plots")?;
        let plotter = ImagePlotter::new(samples.conditions, samples.images, output_dir.join("plots"))
            .context("Failed to prepare sample plots")?;
        let trainer = Trainer::new(model, data, plotter, model_config.input_shape);
        train_loop(trainer, config, start_epoch, progress, history)
    } else {
        let trainer = Trainer::new(model, data, NoopPlotter, model_config.input_shape);
        train_loop(trainer, config, start_epoch, progress, history)
    }
}

fn train_loop<B, M, D, P>(
    mut trainer: Trainer<B, M, D, P>,
    config: &CganConfig,
    start_epoch: usize,
    progress: bool,
    mut history: TrainingHistory,
) -> Result<TrainingHistory>
where
    B: AutodiffBackend,
    M: CompositeModel<B> + Checkpointable,
    D: DataGenerator<B>,
    P: Plotter<B>,
{
    trainer.add_observer(LoggingObserver::default());
    if progress {
        trainer.add_observer(ProgressBarObserver::new());
    }

    let output = &config.output;
    let keep_last = (output.keep_last > 0).then_some(output.keep_last);
    let checkpoints = CheckpointManager::new(output.output_dir.join("checkpoints")).keep_last_n(keep_last);

    let epochs = config.training.epochs;
    for epoch in start_epoch..=epochs {
        let summary = trainer
            .train_epoch(epoch, epochs, config.training.batch_size, config.training.pixel_range)
            .with_context(|| format!("Training failed in epoch {}", epoch))?;

        if output.save_every > 0 && (epoch % output.save_every == 0 || epoch == epochs) {
            let checkpoint = Checkpoint::new(
                epoch,
                summary.discriminator.clone(),
                summary.composite.clone(),
                config.model.input_shape,
                config.model.condition_shape,
            );
            checkpoints.save(trainer.model(), &checkpoint)?;
        }
        history.push(summary);
    }

    history.save_json(&output.output_dir.join("history.json"))?;
    if output.export_csv {
        history.export_csv(&output.output_dir.join("training_metrics.csv"))?;
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use sentinel_core::ImageShape;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn write_dataset(root: &Path, count: usize) {
        std::fs::create_dir_all(root.join("satellite")).unwrap();
        std::fs::create_dir_all(root.join("mask")).unwrap();
        for i in 0..count {
            RgbImage::from_pixel(16, 16, Rgb([40 * i as u8, 100, 200]))
                .save(root.join("satellite").join(format!("tile_{i}.png")))
                .unwrap();
            GrayImage::from_fn(16, 16, |x, _| Luma([if x < 8 { 0 } else { 255 }]))
                .save(root.join("mask").join(format!("tile_{i}.png")))
                .unwrap();
        }
    }

    fn small_config(root: &Path) -> CganConfig {
        let mut config = CganConfig::default();
        config.model.input_shape = ImageShape::new(16, 16, 3);
        config.model.condition_shape = ImageShape::new(16, 16, 1);
        config.model.generator_filters = 4;
        config.model.discriminator_filters = 4;
        config.training.epochs = 2;
        config.training.batch_size = 2;
        config.data.data_dir = root.join("data");
        config.output.output_dir = root.join("output");
        config.output.plot_samples = 2;
        config
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "sentinel-train",
            "--config",
            "cgan.toml",
            "--epochs",
            "7",
            "--batch-size",
            "4",
            "--lr",
            "0.01",
            "--data-dir",
            "tiles",
        ]);
        let mut config = CganConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.training.epochs, 7);
        assert_eq!(config.training.batch_size, 4);
        assert_eq!(config.optimizer.learning_rate, 0.01);
        assert_eq!(config.data.data_dir, PathBuf::from("tiles"));
        assert_eq!(config.output.output_dir, CganConfig::default().output.output_dir);
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/sentinel.toml");
        let config: CganConfig = load_toml_config(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.input_shape, ImageShape::new(256, 256, 3));
    }

    #[test]
    fn test_override_can_invalidate_config() {
        let args = Args::parse_from(["sentinel-train", "-c", "cgan.toml", "--batch-size", "0"]);
        let mut config = CganConfig::default();
        apply_overrides(&mut config, &args);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_training_writes_outputs() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir.path().join("data"), 3);
        let config = small_config(dir.path());

        let history = run_training::<TestBackend>(&config, None, false, Default::default()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.epochs[0].steps, 2);
        assert_eq!(history.epochs[0].examples, 3);

        let output = dir.path().join("output");
        assert!(output.join("plots").join("epoch_001.png").exists());
        assert!(output.join("plots").join("epoch_002.png").exists());
        assert!(output.join("checkpoints").join("checkpoint_epoch_2.json").exists());
        assert!(output.join("checkpoints").join("latest.json").exists());
        assert!(output.join("history.json").exists());
        assert!(output.join("training_metrics.csv").exists());
    }

    #[test]
    fn test_resume_continues_after_checkpoint() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir.path().join("data"), 2);
        let mut config = small_config(dir.path());
        config.training.epochs = 1;
        config.output.plot = false;
        run_training::<TestBackend>(&config, None, false, Default::default()).unwrap();

        config.training.epochs = 2;
        let checkpoints = dir.path().join("output").join("checkpoints");
        let history = run_training::<TestBackend>(&config, Some(&checkpoints), false, Default::default()).unwrap();
        let epochs: Vec<usize> = history.epochs.iter().map(|e| e.epoch).collect();
        assert_eq!(epochs, vec![1, 2]);
    }

    #[test]
    fn test_empty_dataset_runs_without_updates() {
        let dir = TempDir::new().unwrap();
        write_dataset(&dir.path().join("data"), 0);
        let config = small_config(dir.path());

        let history = run_training::<TestBackend>(&config, None, false, Default::default()).unwrap();
        assert_eq!(history.total_steps(), 0);
        assert!(!dir.path().join("output").join("plots").exists());
    }
}
