//! Core domain types for the insight engine

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Direction of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// A transaction as it arrives from the repository boundary, before
/// validation. Field absence is representable so one bad record can be
/// dropped without aborting the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl RawTransaction {
    /// Validate into a [`Transaction`]. A record missing its date, amount,
    /// or type is malformed; so is a negative amount (the sign is carried
    /// by the type, never the amount).
    pub fn validate(self) -> Result<Transaction> {
        let malformed = |reason: &str| Error::Malformed {
            id: self.id,
            reason: reason.to_string(),
        };

        let date = self.date.ok_or_else(|| malformed("missing date"))?;
        let amount = self.amount.ok_or_else(|| malformed("missing amount"))?;
        let kind = self.kind.ok_or_else(|| malformed("missing type"))?;

        if amount < Decimal::ZERO {
            return Err(malformed("negative amount"));
        }

        Ok(Transaction {
            id: self.id,
            date,
            description: self.description.unwrap_or_default(),
            amount,
            kind,
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            note: self.note,
        })
    }
}

/// Drop malformed records from a batch, logging each exclusion. The engine
/// never aborts a whole analysis over one bad row.
pub fn sanitize_transactions(raw: Vec<RawTransaction>) -> Vec<Transaction> {
    let mut valid = Vec::with_capacity(raw.len());

    for record in raw {
        match record.validate() {
            Ok(tx) => valid.push(tx),
            Err(e) => {
                tracing::warn!(error = %e, "Excluding malformed transaction from analysis");
            }
        }
    }

    valid
}

/// A validated financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Always non-negative; the direction comes from `kind`
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub note: Option<String>,
}

impl Transaction {
    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Billing cadence of a recurring group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Recognized payee, but no stable interval; reported in the bills list
    /// and excluded from forecasting
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Irregular => "irregular",
        }
    }

    /// Nominal days between occurrences; `None` for irregular groups
    pub fn interval_days(&self) -> Option<i64> {
        match self {
            Self::Weekly => Some(7),
            Self::Monthly => Some(30),
            Self::Quarterly => Some(91),
            Self::Yearly => Some(365),
            Self::Irregular => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Amount statistics for a recurring group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    pub min: Decimal,
    pub max: Decimal,
    pub average: Decimal,
    /// Percent change between the average of the most recent third of
    /// occurrences and the average of the earliest third
    pub trend_percent: f64,
}

/// A cluster of transactions from one payee believed to repeat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringGroup {
    /// Normalized payee key the group was clustered under
    pub payee: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Date-sorted occurrences (ties broken by transaction id)
    pub occurrences: Vec<Transaction>,
    pub frequency: Frequency,
    pub statistics: GroupStatistics,
    /// 0-100 measure of how certain the detector is that the group repeats
    pub confidence_score: f64,
    /// `None` exactly when the frequency is irregular
    pub next_payment_date: Option<NaiveDate>,
}

impl RecurringGroup {
    /// Average amount normalized to a per-month burden; `None` for
    /// irregular groups, which have no defined cadence to normalize by.
    pub fn monthly_amount(&self) -> Option<Decimal> {
        let interval = self.frequency.interval_days()?;
        Some((self.statistics.average * Decimal::from(30) / Decimal::from(interval)).round_dp(2))
    }
}

/// Shared severity scale for anomaly flags and insights
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// A transaction flagged as a statistical outlier within its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub transaction: Transaction,
    /// Mean of the category baseline the transaction was scored against
    pub category_mean: Decimal,
    /// Sample standard deviation (n-1) of the baseline
    pub category_std_dev: f64,
    pub z_score: f64,
    pub deviation_percent: f64,
    pub severity: Severity,
}

/// Income and expense totals for one calendar month
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

/// Per-category expense totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCategoryAggregate {
    /// First day of the month
    pub month: NaiveDate,
    /// Expense total per category; BTreeMap so iteration order is stable
    pub categories: BTreeMap<String, Decimal>,
    pub totals: MonthTotals,
}

impl MonthlyCategoryAggregate {
    /// (income - expense) / income, or `None` when the month has no income
    pub fn savings_rate(&self) -> Option<f64> {
        if self.totals.income <= Decimal::ZERO {
            return None;
        }
        ((self.totals.income - self.totals.expense) / self.totals.income).to_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(id: i64) -> RawTransaction {
        RawTransaction {
            id,
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
            description: Some("NETFLIX.COM".to_string()),
            amount: Some(dec!(15.49)),
            kind: Some(TransactionType::Expense),
            category: Some("Entertainment".to_string()),
            note: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        let tx = raw(1).validate().unwrap();
        assert_eq!(tx.amount, dec!(15.49));
        assert_eq!(tx.category, "Entertainment");
        assert_eq!(tx.signed_amount(), dec!(-15.49));
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut missing_date = raw(2);
        missing_date.date = None;
        assert!(missing_date.validate().is_err());

        let mut missing_amount = raw(3);
        missing_amount.amount = None;
        assert!(missing_amount.validate().is_err());

        let mut missing_kind = raw(4);
        missing_kind.kind = None;
        let err = missing_kind.validate().unwrap_err();
        assert!(err.to_string().contains("missing type"));
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut negative = raw(5);
        negative.amount = Some(dec!(-12.00));
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_sanitize_drops_only_bad_records() {
        let mut bad = raw(7);
        bad.date = None;

        let valid = sanitize_transactions(vec![raw(6), bad, raw(8)]);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].id, 6);
        assert_eq!(valid[1].id, 8);
    }

    #[test]
    fn test_blank_category_defaults() {
        let mut blank = raw(9);
        blank.category = Some("   ".to_string());
        assert_eq!(blank.validate().unwrap().category, "Uncategorized");
    }

    #[test]
    fn test_frequency_serialization() {
        assert_eq!(Frequency::Quarterly.as_str(), "quarterly");
        assert_eq!(Frequency::from_str("weekly").unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::Irregular.interval_days(), None);
        assert_eq!(Frequency::Monthly.interval_days(), Some(30));
    }

    #[test]
    fn test_savings_rate_guards_zero_income() {
        let aggregate = MonthlyCategoryAggregate {
            month: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            categories: BTreeMap::new(),
            totals: MonthTotals {
                income: Decimal::ZERO,
                expense: dec!(100),
            },
        };
        assert_eq!(aggregate.savings_rate(), None);

        let earning = MonthlyCategoryAggregate {
            totals: MonthTotals {
                income: dec!(2000),
                expense: dec!(1500),
            },
            ..aggregate
        };
        let rate = earning.savings_rate().unwrap();
        assert!((rate - 0.25).abs() < 1e-9);
    }
}
