//! Per-epoch loss history of a training run.

use sentinel_core::{Error, LossRecord, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Mean losses of one epoch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpochSummary {
    /// 1-based epoch number
    pub epoch: usize,
    /// Adversarial iterations run
    pub steps: usize,
    /// Examples consumed
    pub examples: usize,
    /// Mean discriminator record (real/fake average per step)
    pub discriminator: LossRecord,
    /// Mean composite record
    pub composite: LossRecord,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochSummary>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, summary: EpochSummary) {
        self.epochs.push(summary);
    }

    pub fn last(&self) -> Option<&EpochSummary> {
        self.epochs.last()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.epochs.iter().map(|e| e.steps).sum()
    }

    /// Writes one row per epoch.
    ///
    /// Discriminator metrics get a `d_` prefix and composite metrics a `g_`
    /// prefix. Columns come from the first epoch with steps; epochs without
    /// steps leave them empty.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let template = self.epochs.iter().find(|e| e.steps > 0);
        let d_names: Vec<String> = template
            .map(|e| e.discriminator.names().iter().map(|n| n.to_string()).collect())
            .unwrap_or_default();
        let g_names: Vec<String> = template
            .map(|e| e.composite.names().iter().map(|n| n.to_string()).collect())
            .unwrap_or_default();

        let mut file = fs::File::create(path)?;
        let mut header = vec!["epoch".to_string(), "steps".into(), "examples".into()];
        header.extend(d_names.iter().map(|n| format!("d_{n}")));
        header.extend(g_names.iter().map(|n| format!("g_{n}")));
        header.push("duration_secs".into());
        writeln!(file, "{}", header.join(","))?;

        for summary in &self.epochs {
            let mut row = vec![
                summary.epoch.to_string(),
                summary.steps.to_string(),
                summary.examples.to_string(),
            ];
            row.extend(d_names.iter().map(|n| cell(&summary.discriminator, n)));
            row.extend(g_names.iter().map(|n| cell(&summary.composite, n)));
            row.push(format!("{:.3}", summary.duration_secs));
            writeln!(file, "{}", row.join(","))?;
        }

        info!("Training metrics exported to {:?}", path);
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize history: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize history: {}", e)))
    }
}

fn cell(record: &LossRecord, name: &str) -> String {
    record.get(name).map(|v| format!("{v:.6}")).unwrap_or_default()
}
