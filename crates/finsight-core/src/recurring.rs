//! Recurring obligation detection
//!
//! Clusters a transaction window by normalized payee, infers a billing
//! cadence from the gaps between occurrences, and scores how confident the
//! engine is that each cluster is genuinely recurring. Detected groups feed
//! the cash-flow forecaster; irregular groups are still reported for the
//! bills list but never extrapolated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Frequency, GroupStatistics, RecurringGroup, Transaction, TransactionType};

/// Detection thresholds. Every value here is an inferred default, not a
/// contract; deployments tune them through [`crate::config::EngineConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecurringConfig {
    /// Minimum occurrences before a payee cluster is reported at all
    pub min_occurrences: usize,
    /// Tolerance around the 7-day nominal gap
    pub weekly_tolerance_days: i64,
    /// Tolerance around the 30-day nominal gap
    pub monthly_tolerance_days: i64,
    /// Tolerance around the 91-day nominal gap
    pub quarterly_tolerance_days: i64,
    /// Tolerance around the 365-day nominal gap
    pub yearly_tolerance_days: i64,
    /// Share of gaps that must sit within tolerance of the nominal interval
    pub interval_consistency: f64,
    /// A single amount above this multiple of the group median is excluded
    /// from the amount statistics
    pub outlier_ratio: f64,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            weekly_tolerance_days: 2,
            monthly_tolerance_days: 5,
            quarterly_tolerance_days: 10,
            yearly_tolerance_days: 20,
            interval_consistency: 0.7,
            outlier_ratio: 3.0,
        }
    }
}

/// Detects recurring payee groups in a transaction window
pub struct RecurringPatternDetector {
    config: RecurringConfig,
}

impl Default for RecurringPatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurringPatternDetector {
    pub fn new() -> Self {
        Self {
            config: RecurringConfig::default(),
        }
    }

    pub fn with_config(config: RecurringConfig) -> Self {
        Self { config }
    }

    /// Cluster `transactions` into recurring groups.
    ///
    /// `today` anchors the next-payment roll-forward; callers inject it so
    /// repeated runs over the same window are byte-identical. Output is
    /// sorted by (payee, type).
    pub fn detect(&self, transactions: &[Transaction], today: NaiveDate) -> Vec<RecurringGroup> {
        let mut by_payee: BTreeMap<(String, TransactionType), Vec<Transaction>> = BTreeMap::new();

        for tx in transactions {
            let key = normalize_payee(&tx.description);
            if key.is_empty() {
                continue;
            }
            by_payee.entry((key, tx.kind)).or_default().push(tx.clone());
        }

        let mut groups = Vec::new();

        for ((payee, kind), mut occurrences) in by_payee {
            if occurrences.len() < self.config.min_occurrences {
                debug!(
                    payee = payee.as_str(),
                    occurrences = occurrences.len(),
                    "Skipping payee with too few occurrences"
                );
                continue;
            }

            occurrences.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
            groups.push(self.build_group(payee, kind, occurrences, today));
        }

        debug!(groups = groups.len(), "Recurring pattern detection complete");
        groups
    }

    fn build_group(
        &self,
        payee: String,
        kind: TransactionType,
        occurrences: Vec<Transaction>,
        today: NaiveDate,
    ) -> RecurringGroup {
        let gaps: Vec<i64> = occurrences
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .collect();
        let gap_values: Vec<f64> = gaps.iter().map(|g| *g as f64).collect();

        let mut frequency = self.infer_frequency(&gap_values);
        if frequency != Frequency::Irregular && distinct_periods(&occurrences, frequency) < 2 {
            debug!(
                payee = payee.as_str(),
                frequency = frequency.as_str(),
                "Demoting group spanning a single calendar period"
            );
            frequency = Frequency::Irregular;
        }

        let amounts: Vec<Decimal> = occurrences.iter().map(|t| t.amount).collect();
        let stats_amounts = exclude_single_outlier(&amounts, self.config.outlier_ratio);
        let statistics = compute_statistics(&stats_amounts);
        let confidence_score = confidence_score(occurrences.len(), &amounts, &gap_values);

        let last_date = occurrences
            .last()
            .map(|t| t.date)
            .unwrap_or(today);
        let next_payment_date = frequency
            .interval_days()
            .map(|interval| next_payment(last_date, interval, today));

        RecurringGroup {
            payee,
            kind,
            occurrences,
            frequency,
            statistics,
            confidence_score,
            next_payment_date,
        }
    }

    /// Map the median gap to the nearest nominal cadence inside its
    /// tolerance band, then require most gaps to agree with it.
    fn infer_frequency(&self, gap_values: &[f64]) -> Frequency {
        if gap_values.is_empty() {
            return Frequency::Irregular;
        }

        let median_gap = median(gap_values);
        let candidates = [
            (Frequency::Weekly, 7.0, self.config.weekly_tolerance_days),
            (Frequency::Monthly, 30.0, self.config.monthly_tolerance_days),
            (
                Frequency::Quarterly,
                91.0,
                self.config.quarterly_tolerance_days,
            ),
            (Frequency::Yearly, 365.0, self.config.yearly_tolerance_days),
        ];

        let nearest = candidates
            .iter()
            .filter(|(_, nominal, tolerance)| (median_gap - nominal).abs() <= *tolerance as f64)
            .min_by(|a, b| {
                let da = (median_gap - a.1).abs();
                let db = (median_gap - b.1).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });

        let Some((frequency, nominal, tolerance)) = nearest else {
            return Frequency::Irregular;
        };

        let consistent = gap_values
            .iter()
            .filter(|gap| (*gap - nominal).abs() <= *tolerance as f64)
            .count();

        if (consistent as f64 / gap_values.len() as f64) < self.config.interval_consistency {
            return Frequency::Irregular;
        }

        *frequency
    }
}

/// Normalize a transaction description into a payee grouping key.
///
/// Uppercases, treats `*`/`#` as separators, drops purely numeric tokens
/// (store and reference numbers), and keeps the first three significant
/// words.
pub fn normalize_payee(description: &str) -> String {
    description
        .to_uppercase()
        .replace(['*', '#'], " ")
        .split_whitespace()
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Distinct calendar periods of the inferred cadence covered by the group
fn distinct_periods(occurrences: &[Transaction], frequency: Frequency) -> usize {
    let mut periods: BTreeSet<(i32, u32)> = BTreeSet::new();

    for tx in occurrences {
        let key = match frequency {
            Frequency::Weekly => {
                let week = tx.date.iso_week();
                (week.year(), week.week())
            }
            Frequency::Monthly => (tx.date.year(), tx.date.month()),
            Frequency::Quarterly => (tx.date.year(), tx.date.month0() / 3),
            Frequency::Yearly => (tx.date.year(), 0),
            Frequency::Irregular => return 0,
        };
        periods.insert(key);
    }

    periods.len()
}

/// Drop a single extreme amount from the statistics input.
///
/// When exactly one amount exceeds `ratio` times the group median it is
/// treated as a one-off (an annual true-up, a double charge) and excluded
/// from min/max/average/trend. Two or more large amounts mean the group is
/// genuinely variable and nothing is excluded.
fn exclude_single_outlier(amounts: &[Decimal], ratio: f64) -> Vec<Decimal> {
    if amounts.len() < 3 {
        return amounts.to_vec();
    }

    let values: Vec<f64> = amounts
        .iter()
        .map(|a| a.to_f64().unwrap_or(0.0))
        .collect();
    let median_amount = median(&values);
    if median_amount <= 0.0 {
        return amounts.to_vec();
    }

    let outliers: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > ratio * median_amount)
        .map(|(i, _)| i)
        .collect();

    if outliers.len() != 1 {
        return amounts.to_vec();
    }

    let skip = outliers[0];
    amounts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, a)| *a)
        .collect()
}

fn compute_statistics(amounts: &[Decimal]) -> GroupStatistics {
    if amounts.is_empty() {
        return GroupStatistics {
            min: Decimal::ZERO,
            max: Decimal::ZERO,
            average: Decimal::ZERO,
            trend_percent: 0.0,
        };
    }

    let min = amounts.iter().min().copied().unwrap_or(Decimal::ZERO);
    let max = amounts.iter().max().copied().unwrap_or(Decimal::ZERO);
    let sum: Decimal = amounts.iter().copied().sum();
    let average = (sum / Decimal::from(amounts.len() as i64)).round_dp(2);

    GroupStatistics {
        min,
        max,
        average,
        trend_percent: trend_percent(amounts),
    }
}

/// Percent change between the average of the most recent third of amounts
/// (chronological order) and the average of the earliest third. A zero
/// early average short-circuits to 0%.
fn trend_percent(amounts: &[Decimal]) -> f64 {
    let k = (amounts.len() / 3).max(1);

    let early: Decimal = amounts[..k].iter().copied().sum::<Decimal>() / Decimal::from(k as i64);
    let late: Decimal = amounts[amounts.len() - k..]
        .iter()
        .copied()
        .sum::<Decimal>()
        / Decimal::from(k as i64);

    if early.is_zero() {
        return 0.0;
    }

    ((late - early) / early * Decimal::from(100))
        .to_f64()
        .unwrap_or(0.0)
}

/// Weighted 0-100 confidence that a group is genuinely recurring.
///
/// Combines occurrence count (capped at a year of monthly charges), amount
/// regularity, and gap regularity; each term is independently monotonic, so
/// more occurrences, steadier amounts, or steadier gaps never lower the
/// score.
fn confidence_score(count: usize, amounts: &[Decimal], gap_values: &[f64]) -> f64 {
    let count_component = count.min(12) as f64 / 12.0;
    let amount_values: Vec<f64> = amounts
        .iter()
        .map(|a| a.to_f64().unwrap_or(0.0))
        .collect();

    let score = 100.0
        * (0.4 * count_component
            + 0.3 * regularity(&amount_values)
            + 0.3 * regularity(gap_values));
    score.clamp(0.0, 100.0)
}

/// 1 / (1 + coefficient of variation): 1.0 for perfectly steady values,
/// approaching 0 as the spread grows
fn regularity(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= f64::EPSILON {
        return 1.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    1.0 / (1.0 + variance.sqrt() / mean)
}

/// Last occurrence plus one interval, rolled forward until it is after
/// `today`
fn next_payment(last_seen: NaiveDate, interval_days: i64, today: NaiveDate) -> NaiveDate {
    let mut next = last_seen + Duration::days(interval_days);
    while next <= today {
        next += Duration::days(interval_days);
    }
    next
}

/// Calculate median of a slice
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
