//! Core types for generated insights

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use crate::models::Severity;

/// Types of insights that can be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// A category's spend rose sharply month over month
    SpendingIncrease,
    /// A category's spend fell sharply month over month
    SpendingDecrease,
    /// Recurring obligations dominate a category
    Pattern,
    /// A condition that needs attention (savings rate, outlier charges)
    Warning,
    /// A previously warned condition resolved favorably
    Achievement,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::SpendingIncrease => "spending_increase",
            InsightType::SpendingDecrease => "spending_decrease",
            InsightType::Pattern => "pattern",
            InsightType::Warning => "warning",
            InsightType::Achievement => "achievement",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spending_increase" => Ok(InsightType::SpendingIncrease),
            "spending_decrease" => Ok(InsightType::SpendingDecrease),
            "pattern" => Ok(InsightType::Pattern),
            "warning" => Ok(InsightType::Warning),
            "achievement" => Ok(InsightType::Achievement),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// Machine-readable tag carried by insights the recommendation engine
/// dispatches on, so matching never depends on natural-language titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightMarker {
    /// Pattern insight: recurring charges dominate a category
    RecurringExpense,
    /// Goal insight: the user has not defined any goals
    NoGoalsDefined,
    /// Goal insight: a goal is progressing slower than planned
    SlowGoalProgress,
}

impl InsightMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightMarker::RecurringExpense => "recurring_expense",
            InsightMarker::NoGoalsDefined => "no_goals_defined",
            InsightMarker::SlowGoalProgress => "slow_goal_progress",
        }
    }
}

/// A typed observation about spending behavior over the analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    /// Monetary magnitude of the observation, where one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<Decimal>,
    /// Dispatch tag for the recommendation engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<InsightMarker>,
    /// Insight-specific structured data
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Insight {
    pub fn new(
        insight_type: InsightType,
        severity: Severity,
        category: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            severity,
            category: category.into(),
            title: title.into(),
            description: description.into(),
            impact: None,
            marker: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_impact(mut self, impact: Decimal) -> Self {
        self.impact = Some(impact);
        self
    }

    pub fn with_marker(mut self, marker: InsightMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Add structured data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Data for spending change insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingChangeData {
    pub category: String,
    pub previous: Decimal,
    pub current: Decimal,
    pub percent_change: f64,
}

/// Data for savings-rate warnings and achievements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsRateData {
    pub income: Decimal,
    pub expense: Decimal,
    /// `None` when the month had no income
    pub rate: Option<f64>,
    pub floor: f64,
}

/// Data for anomaly-driven warnings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyWarningData {
    pub transaction_id: i64,
    pub category: String,
    pub amount: Decimal,
    pub z_score: f64,
    pub deviation_percent: f64,
}

/// Data for recurring-burden pattern insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringBurdenData {
    pub category: String,
    pub monthly_burden: Decimal,
    pub category_spend: Decimal,
    pub share_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insight_type_serialization() {
        assert_eq!(InsightType::SpendingIncrease.as_str(), "spending_increase");
        assert_eq!(
            InsightType::from_str("achievement").unwrap(),
            InsightType::Achievement
        );
        assert!(InsightType::from_str("bogus").is_err());
    }

    #[test]
    fn test_severity_priority() {
        assert!(Severity::High.priority() > Severity::Medium.priority());
        assert!(Severity::Medium.priority() > Severity::Low.priority());
    }

    #[test]
    fn test_insight_builder() {
        let insight = Insight::new(
            InsightType::Pattern,
            Severity::Medium,
            "Entertainment",
            "Recurring charges dominate Entertainment",
            "Subscriptions make up most of the category",
        )
        .with_impact(dec!(46.47))
        .with_marker(InsightMarker::RecurringExpense)
        .with_data(serde_json::json!({"share_percent": 72.0}));

        assert_eq!(insight.impact.unwrap(), dec!(46.47));
        assert_eq!(insight.marker.unwrap(), InsightMarker::RecurringExpense);
        assert_eq!(insight.data["share_percent"], 72.0);
    }

    #[test]
    fn test_marker_serializes_snake_case() {
        let json = serde_json::to_string(&InsightMarker::NoGoalsDefined).unwrap();
        assert_eq!(json, "\"no_goals_defined\"");
    }
}
