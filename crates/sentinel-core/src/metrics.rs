//! Named loss metrics reported by training steps.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single named scalar metric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
}

/// Ordered list of named scalar metrics returned by one training step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LossRecord {
    metrics: Vec<Metric>,
}

impl LossRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with one metric
    pub fn single(name: impl Into<String>, value: f64) -> Self {
        Self::new().with(name, value)
    }

    /// Appends a metric, keeping insertion order
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.push(Metric {
            name: name.into(),
            value,
        });
        self
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Looks up a metric value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }

    /// Metric names in order
    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }

    /// `(name, value)` pairs in order
    pub fn pairs(&self) -> Vec<(String, f64)> {
        self.metrics
            .iter()
            .map(|m| (m.name.clone(), m.value))
            .collect()
    }

    /// True when every value is finite
    pub fn is_finite(&self) -> bool {
        self.metrics.iter().all(|m| m.value.is_finite())
    }

    /// Element-wise `(self + other) / 2`.
    ///
    /// Both records must carry the same metric names in the same order.
    pub fn average(&self, other: &LossRecord) -> Result<LossRecord> {
        self.check_compatible(other)?;
        let metrics = self
            .metrics
            .iter()
            .zip(&other.metrics)
            .map(|(a, b)| Metric {
                name: a.name.clone(),
                value: (a.value + b.value) / 2.0,
            })
            .collect();
        Ok(LossRecord { metrics })
    }

    fn check_compatible(&self, other: &LossRecord) -> Result<()> {
        if self.names() != other.names() {
            return Err(Error::Shape(format!(
                "loss records differ: {:?} vs {:?}",
                self.names(),
                other.names()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for LossRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .metrics
            .iter()
            .map(|m| format!("{}={:.4}", m.name, m.value))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Running mean over a sequence of loss records with identical layout.
#[derive(Debug, Clone, Default)]
pub struct LossAccumulator {
    sums: LossRecord,
    count: usize,
}

impl LossAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record to the running sums
    pub fn push(&mut self, record: &LossRecord) -> Result<()> {
        if self.count == 0 {
            self.sums = record.clone();
        } else {
            self.sums.check_compatible(record)?;
            for (sum, m) in self.sums.metrics.iter_mut().zip(&record.metrics) {
                sum.value += m.value;
            }
        }
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of every pushed record; empty when nothing was pushed
    pub fn mean(&self) -> LossRecord {
        if self.count == 0 {
            return LossRecord::new();
        }
        let n = self.count as f64;
        let metrics = self
            .sums
            .metrics
            .iter()
            .map(|m| Metric {
                name: m.name.clone(),
                value: m.value / n,
            })
            .collect();
        LossRecord { metrics }
    }
}
