//! Checkpointing of the cGAN networks.
//!
//! A checkpoint is a JSON metadata file plus a directory of Burn module
//! records:
//!
//! ```text
//! checkpoints/
//!   checkpoint_epoch_3.json
//!   epoch_3/generator.mpk
//!   epoch_3/discriminator.mpk
//!   latest.json
//! ```
//!
//! Optimizer state is not persisted; resumed runs start with fresh Adam
//! moments.

use chrono::Utc;
use sentinel_core::{Error, ImageShape, LossRecord, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LATEST: &str = "latest.json";

/// Anything whose weights can be written to and read from a directory
pub trait Checkpointable {
    fn save_records(&self, dir: &Path) -> Result<()>;

    fn load_records(&mut self, dir: &Path) -> Result<()>;
}

/// Metadata written next to the module records of one epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: usize,
    pub timestamp: String,
    pub discriminator_loss: LossRecord,
    pub composite_loss: LossRecord,
    pub input_shape: ImageShape,
    pub condition_shape: ImageShape,
}

impl Checkpoint {
    pub fn new(
        epoch: usize,
        discriminator_loss: LossRecord,
        composite_loss: LossRecord,
        input_shape: ImageShape,
        condition_shape: ImageShape,
    ) -> Self {
        Self {
            epoch,
            timestamp: Utc::now().to_rfc3339(),
            discriminator_loss,
            composite_loss,
            input_shape,
            condition_shape,
        }
    }

    /// Save checkpoint metadata to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize checkpoint: {}", e)))?;
        fs::write(path, json)?;

        info!("Checkpoint saved to {:?}", path);
        Ok(())
    }

    /// Load checkpoint metadata from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("checkpoint {:?}", path)));
        }
        let json = fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize checkpoint: {}", e)))?;
        Ok(checkpoint)
    }
}

/// Writes, restores and prunes per-epoch checkpoints
pub struct CheckpointManager {
    checkpoint_dir: PathBuf,
    keep_last_n: Option<usize>,
}

impl CheckpointManager {
    pub fn new(checkpoint_dir: PathBuf) -> Self {
        Self {
            checkpoint_dir,
            keep_last_n: Some(3),
        }
    }

    /// How many recent checkpoints to keep (`None` keeps all)
    pub fn keep_last_n(mut self, n: Option<usize>) -> Self {
        self.keep_last_n = n;
        self
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    fn metadata_path(&self, epoch: usize) -> PathBuf {
        self.checkpoint_dir.join(format!("checkpoint_epoch_{}.json", epoch))
    }

    fn records_dir(&self, epoch: usize) -> PathBuf {
        self.checkpoint_dir.join(format!("epoch_{}", epoch))
    }

    /// Saves the model records and metadata for `checkpoint.epoch`
    pub fn save<M: Checkpointable>(&self, model: &M, checkpoint: &Checkpoint) -> Result<()> {
        fs::create_dir_all(&self.checkpoint_dir)?;

        model.save_records(&self.records_dir(checkpoint.epoch))?;
        checkpoint.save(&self.metadata_path(checkpoint.epoch))?;
        checkpoint.save(&self.checkpoint_dir.join(LATEST))?;

        if let Some(keep_n) = self.keep_last_n {
            self.cleanup_old_checkpoints(keep_n)?;
        }
        Ok(())
    }

    /// Loads the records of `epoch` into `model` and returns its metadata
    pub fn restore<M: Checkpointable>(&self, model: &mut M, epoch: usize) -> Result<Checkpoint> {
        let checkpoint = Checkpoint::load(&self.metadata_path(epoch))?;
        let records = self.records_dir(epoch);
        if !records.is_dir() {
            return Err(Error::NotFound(format!("records for epoch {} in {:?}", epoch, records)));
        }
        model.load_records(&records)?;
        info!("Restored checkpoint of epoch {} from {:?}", epoch, self.checkpoint_dir);
        Ok(checkpoint)
    }

    /// Restores the most recent checkpoint
    pub fn restore_latest<M: Checkpointable>(&self, model: &mut M) -> Result<Checkpoint> {
        let latest = self.load_latest()?;
        self.restore(model, latest.epoch)
    }

    pub fn load_latest(&self) -> Result<Checkpoint> {
        Checkpoint::load(&self.checkpoint_dir.join(LATEST))
    }

    /// Epoch metadata files, oldest first
    pub fn list_checkpoints(&self) -> Result<Vec<PathBuf>> {
        if !self.checkpoint_dir.exists() {
            return Ok(Vec::new());
        }

        let mut checkpoints = Vec::new();
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let path = entry?.path();
            let epoch = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(extract_epoch_from_filename);
            if let (true, Some(epoch)) = (path.is_file(), epoch) {
                checkpoints.push((epoch, path));
            }
        }

        checkpoints.sort_by_key(|(epoch, _)| *epoch);
        Ok(checkpoints.into_iter().map(|(_, path)| path).collect())
    }

    fn cleanup_old_checkpoints(&self, keep_n: usize) -> Result<()> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= keep_n {
            return Ok(());
        }

        let to_remove = checkpoints.len() - keep_n;
        for path in checkpoints.iter().take(to_remove) {
            let epoch = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(extract_epoch_from_filename);
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
                continue;
            }
            if let Some(epoch) = epoch {
                let records = self.records_dir(epoch);
                if records.is_dir() {
                    if let Err(e) = fs::remove_dir_all(&records) {
                        warn!("Failed to remove old records {:?}: {}", records, e);
                    }
                }
            }
            info!("Removed old checkpoint: {:?}", path);
        }
        Ok(())
    }
}

/// Epoch number of a `checkpoint_epoch_<N>.json` file name
pub fn extract_epoch_from_filename(filename: &str) -> Option<usize> {
    filename
        .strip_prefix("checkpoint_epoch_")
        .and_then(|s| s.strip_suffix(".json"))
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes a single weights file holding `value`
    #[derive(Default)]
    struct FakeModel {
        value: u32,
    }

    impl Checkpointable for FakeModel {
        fn save_records(&self, dir: &Path) -> Result<()> {
            fs::create_dir_all(dir)?;
            fs::write(dir.join("weights"), self.value.to_string())?;
            Ok(())
        }

        fn load_records(&mut self, dir: &Path) -> Result<()> {
            let text = fs::read_to_string(dir.join("weights"))?;
            self.value = text
                .parse()
                .map_err(|_| Error::Serialization(text.clone()))?;
            Ok(())
        }
    }

    fn checkpoint(epoch: usize) -> Checkpoint {
        Checkpoint::new(
            epoch,
            LossRecord::single("loss", 0.5),
            LossRecord::single("loss", 1.5).with("validity_loss", 0.5).with("image_loss", 1.0),
            ImageShape::new(256, 256, 3),
            ImageShape::new(256, 256, 1),
        )
    }

    #[test]
    fn test_checkpoint_save_load() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("checkpoint.json");

        let original = checkpoint(7);
        original.save(&path)?;
        let loaded = Checkpoint::load(&path)?;

        assert_eq!(loaded.epoch, 7);
        assert_eq!(loaded.composite_loss.get("image_loss"), Some(1.0));
        assert_eq!(loaded.input_shape, original.input_shape);
        Ok(())
    }

    #[test]
    fn test_missing_checkpoint_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = Checkpoint::load(&temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_manager_save_and_restore() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp_dir.path().to_path_buf());

        manager.save(&FakeModel { value: 11 }, &checkpoint(1))?;
        manager.save(&FakeModel { value: 22 }, &checkpoint(2))?;

        let mut model = FakeModel::default();
        let restored = manager.restore(&mut model, 1)?;
        assert_eq!(restored.epoch, 1);
        assert_eq!(model.value, 11);

        let latest = manager.restore_latest(&mut model)?;
        assert_eq!(latest.epoch, 2);
        assert_eq!(model.value, 22);
        Ok(())
    }

    #[test]
    fn test_manager_keeps_last_n_with_records() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp_dir.path().to_path_buf()).keep_last_n(Some(2));

        for epoch in [1, 2, 9, 10] {
            manager.save(&FakeModel { value: epoch as u32 }, &checkpoint(epoch))?;
        }

        let names: Vec<String> = manager
            .list_checkpoints()?
            .iter()
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(String::from))
            .collect();
        assert_eq!(names, vec!["checkpoint_epoch_9.json", "checkpoint_epoch_10.json"]);
        assert!(!temp_dir.path().join("epoch_2").exists());
        assert!(temp_dir.path().join("epoch_10").exists());
        assert_eq!(manager.load_latest()?.epoch, 10);
        Ok(())
    }

    #[test]
    fn test_manager_keep_all() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp_dir.path().to_path_buf()).keep_last_n(None);
        for epoch in 0..5 {
            manager.save(&FakeModel::default(), &checkpoint(epoch))?;
        }
        assert_eq!(manager.list_checkpoints()?.len(), 5);
        Ok(())
    }

    #[test]
    fn test_restore_without_records_fails() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(temp_dir.path().to_path_buf());
        checkpoint(4).save(&temp_dir.path().join("checkpoint_epoch_4.json"))?;

        let result = manager.restore(&mut FakeModel::default(), 4);
        assert!(matches!(result, Err(Error::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_extract_epoch_from_filename() {
        assert_eq!(extract_epoch_from_filename("checkpoint_epoch_5.json"), Some(5));
        assert_eq!(extract_epoch_from_filename("checkpoint_epoch_123.json"), Some(123));
        assert_eq!(extract_epoch_from_filename("latest.json"), None);
        assert_eq!(extract_epoch_from_filename("invalid.json"), None);
    }
}
