//! Statistical outlier detection
//!
//! Scores each transaction against the distribution of the other
//! transactions in its category. The baseline deliberately excludes the
//! transaction being scored: a genuinely extreme charge would otherwise
//! inflate its own baseline enough to hide itself.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::models::{AnomalyFlag, Severity, Transaction};

/// Outlier thresholds; tunable via [`crate::config::EngineConfig`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Minimum baseline points (category minus the scored transaction)
    /// before anything in the category is flagged
    pub min_history: usize,
    /// |z-score| at which a transaction is flagged
    pub z_score_threshold: f64,
    /// |deviation%| at which severity becomes medium
    pub medium_deviation_percent: f64,
    /// |deviation%| at which severity becomes high
    pub high_deviation_percent: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            z_score_threshold: 2.0,
            medium_deviation_percent: 50.0,
            high_deviation_percent: 100.0,
        }
    }
}

/// Flags transactions that sit far outside their category's baseline
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self {
            config: AnomalyConfig::default(),
        }
    }

    pub fn with_config(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Score every transaction against its category baseline and return the
    /// outliers, in (category, date, id) order.
    ///
    /// Categories with too little history are skipped, never an error.
    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> Vec<AnomalyFlag> {
        let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_category.entry(tx.category.as_str()).or_default().push(tx);
        }

        let mut flags = Vec::new();

        for (category, mut members) in by_category {
            if members.len() <= self.config.min_history {
                debug!(
                    category,
                    points = members.len(),
                    "Skipping category with insufficient history"
                );
                continue;
            }

            members.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

            for (index, tx) in members.iter().enumerate() {
                if let Some(flag) = self.score(tx, &members, index) {
                    flags.push(flag);
                }
            }
        }

        debug!(flags = flags.len(), "Anomaly detection complete");
        flags
    }

    /// Score one transaction against the rest of its category
    fn score(
        &self,
        tx: &Transaction,
        members: &[&Transaction],
        index: usize,
    ) -> Option<AnomalyFlag> {
        let baseline: Vec<Decimal> = members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, t)| t.amount)
            .collect();

        if baseline.len() < self.config.min_history {
            return None;
        }

        let sum: Decimal = baseline.iter().copied().sum();
        let mean = sum / Decimal::from(baseline.len() as i64);
        let mean_f = mean.to_f64()?;

        // Sample standard deviation (n-1 denominator)
        let variance = baseline
            .iter()
            .map(|a| {
                let v = a.to_f64().unwrap_or(0.0);
                (v - mean_f).powi(2)
            })
            .sum::<f64>()
            / (baseline.len() - 1) as f64;
        let std_dev = variance.sqrt();

        if std_dev <= f64::EPSILON {
            return None;
        }

        let amount = tx.amount.to_f64()?;
        let z_score = (amount - mean_f) / std_dev;
        if z_score.abs() < self.config.z_score_threshold {
            return None;
        }

        // mean_f > 0 is implied: amounts are non-negative and a zero mean
        // with non-zero std_dev is impossible
        let deviation_percent = (amount - mean_f) / mean_f * 100.0;

        let severity = if deviation_percent.abs() >= self.config.high_deviation_percent {
            Severity::High
        } else if deviation_percent.abs() >= self.config.medium_deviation_percent {
            Severity::Medium
        } else {
            Severity::Low
        };

        Some(AnomalyFlag {
            transaction: (*tx).clone(),
            category_mean: mean.round_dp(2),
            category_std_dev: std_dev,
            z_score,
            deviation_percent,
            severity,
        })
    }
}
