//! Insight generation
//!
//! Turns monthly aggregates plus the recurring/anomaly signals into typed,
//! severity-ranked observations. Output order is fixed (spending changes,
//! warnings, patterns, achievements) so downstream consumers and tests can
//! rely on it.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::models::{
    AnomalyFlag, MonthlyCategoryAggregate, RecurringGroup, Severity, TransactionType,
};

use super::types::{
    AnomalyWarningData, Insight, InsightMarker, InsightType, RecurringBurdenData, SavingsRateData,
    SpendingChangeData,
};

/// Insight thresholds; tunable via [`crate::config::EngineConfig`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Months of aggregates required before any insight is produced
    pub min_months: usize,
    /// Month-over-month change (percent) that triggers a spending insight
    pub change_threshold_percent: f64,
    /// |change%| at which a spending insight becomes medium severity
    pub medium_change_percent: f64,
    /// |change%| at which a spending insight becomes high severity
    pub high_change_percent: f64,
    /// Savings rate below which the latest month draws a warning
    pub savings_rate_floor: f64,
    /// Share of a category's spend (percent) that recurring charges must
    /// reach to draw a pattern insight
    pub recurring_share_percent: f64,
    /// Surface high-severity anomaly flags as warning insights
    pub anomaly_warnings: bool,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_months: 2,
            change_threshold_percent: 20.0,
            medium_change_percent: 40.0,
            high_change_percent: 80.0,
            savings_rate_floor: 0.05,
            recurring_share_percent: 50.0,
            anomaly_warnings: true,
        }
    }
}

/// Produces typed insights from one analysis window
pub struct InsightGenerator {
    config: InsightConfig,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightGenerator {
    pub fn new() -> Self {
        Self {
            config: InsightConfig::default(),
        }
    }

    pub fn with_config(config: InsightConfig) -> Self {
        Self { config }
    }

    /// Generate insights for a window of monthly aggregates (oldest first).
    ///
    /// Fewer than two months yields an empty list rather than misleading
    /// single-point observations.
    pub fn generate(
        &self,
        months: &[MonthlyCategoryAggregate],
        groups: &[RecurringGroup],
        anomalies: &[AnomalyFlag],
    ) -> Vec<Insight> {
        if months.len() < self.config.min_months {
            debug!(
                months = months.len(),
                "Not enough aggregate history for insights"
            );
            return Vec::new();
        }

        let latest = &months[months.len() - 1];
        let prior = &months[months.len() - 2];

        let mut insights = Vec::new();
        self.spending_changes(latest, prior, &mut insights);
        self.savings_warning(latest, &mut insights);
        self.anomaly_warnings(anomalies, &mut insights);
        self.recurring_patterns(latest, groups, &mut insights);
        self.achievements(latest, prior, &mut insights);

        debug!(insights = insights.len(), "Insight generation complete");
        insights
    }

    /// Month-over-month per-category comparison
    fn spending_changes(
        &self,
        latest: &MonthlyCategoryAggregate,
        prior: &MonthlyCategoryAggregate,
        insights: &mut Vec<Insight>,
    ) {
        let categories: BTreeSet<&String> = latest
            .categories
            .keys()
            .chain(prior.categories.keys())
            .collect();

        for category in categories {
            let previous = prior
                .categories
                .get(category)
                .copied()
                .unwrap_or(Decimal::ZERO);
            // A category with no prior spend has no baseline to compare
            // against; skipped rather than reported as an infinite increase
            if previous <= Decimal::ZERO {
                continue;
            }
            let current = latest
                .categories
                .get(category)
                .copied()
                .unwrap_or(Decimal::ZERO);

            let percent_change = ((current - previous) / previous * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0);
            if percent_change.abs() < self.config.change_threshold_percent {
                continue;
            }

            let (insight_type, direction) = if percent_change > 0.0 {
                (InsightType::SpendingIncrease, "up")
            } else {
                (InsightType::SpendingDecrease, "down")
            };
            let severity = if percent_change.abs() >= self.config.high_change_percent {
                Severity::High
            } else if percent_change.abs() >= self.config.medium_change_percent {
                Severity::Medium
            } else {
                Severity::Low
            };

            let data = SpendingChangeData {
                category: category.clone(),
                previous,
                current,
                percent_change,
            };

            insights.push(
                Insight::new(
                    insight_type,
                    severity,
                    category.clone(),
                    format!(
                        "{} spending {} {:.0}%",
                        category,
                        direction,
                        percent_change.abs()
                    ),
                    format!(
                        "{} this month vs {} the month before",
                        current.round_dp(2),
                        previous.round_dp(2)
                    ),
                )
                .with_impact((current - previous).abs())
                .with_data(serde_json::to_value(&data).unwrap_or_default()),
            );
        }
    }

    /// True when the month's savings rate falls below the configured floor
    fn savings_below_floor(&self, month: &MonthlyCategoryAggregate) -> bool {
        match month.savings_rate() {
            Some(rate) => rate < self.config.savings_rate_floor,
            // No income at all: only a problem if money went out
            None => month.totals.expense > Decimal::ZERO,
        }
    }

    fn savings_warning(&self, latest: &MonthlyCategoryAggregate, insights: &mut Vec<Insight>) {
        if !self.savings_below_floor(latest) {
            return;
        }

        let rate = latest.savings_rate();
        let overspending = rate.map(|r| r < 0.0).unwrap_or(true);
        let severity = if overspending {
            Severity::High
        } else {
            Severity::Medium
        };
        let title = if overspending {
            "Spending exceeds income".to_string()
        } else {
            "Savings rate below target".to_string()
        };
        let description = match rate {
            Some(r) => format!(
                "You saved {:.1}% of your income this month (target {:.0}%)",
                r * 100.0,
                self.config.savings_rate_floor * 100.0
            ),
            None => "This month had expenses but no recorded income".to_string(),
        };

        let data = SavingsRateData {
            income: latest.totals.income,
            expense: latest.totals.expense,
            rate,
            floor: self.config.savings_rate_floor,
        };

        let shortfall = latest.totals.expense - latest.totals.income;
        let mut insight = Insight::new(InsightType::Warning, severity, "Savings", title, description)
            .with_data(serde_json::to_value(&data).unwrap_or_default());
        if shortfall > Decimal::ZERO {
            insight = insight.with_impact(shortfall);
        }

        insights.push(insight);
    }

    /// Surface high-severity outliers as warnings
    fn anomaly_warnings(&self, anomalies: &[AnomalyFlag], insights: &mut Vec<Insight>) {
        if !self.config.anomaly_warnings {
            return;
        }

        for flag in anomalies.iter().filter(|f| f.severity == Severity::High) {
            let tx = &flag.transaction;
            let data = AnomalyWarningData {
                transaction_id: tx.id,
                category: tx.category.clone(),
                amount: tx.amount,
                z_score: flag.z_score,
                deviation_percent: flag.deviation_percent,
            };

            insights.push(
                Insight::new(
                    InsightType::Warning,
                    Severity::High,
                    tx.category.clone(),
                    format!("Unusual {} charge", tx.category),
                    format!(
                        "{} ({}) is {:.0}% above the {} average",
                        tx.description,
                        tx.amount.round_dp(2),
                        flag.deviation_percent,
                        tx.category
                    ),
                )
                .with_impact(tx.amount - flag.category_mean)
                .with_data(serde_json::to_value(&data).unwrap_or_default()),
            );
        }
    }

    /// Categories where recurring charges make up most of the spend
    fn recurring_patterns(
        &self,
        latest: &MonthlyCategoryAggregate,
        groups: &[RecurringGroup],
        insights: &mut Vec<Insight>,
    ) {
        let mut burdens: BTreeMap<String, Decimal> = BTreeMap::new();

        for group in groups {
            if group.kind != TransactionType::Expense {
                continue;
            }
            let Some(monthly) = group.monthly_amount() else {
                continue;
            };
            let Some(category) = dominant_category(group) else {
                continue;
            };
            *burdens.entry(category).or_insert(Decimal::ZERO) += monthly;
        }

        for (category, burden) in burdens {
            let Some(spend) = latest.categories.get(&category).copied() else {
                continue;
            };
            if spend <= Decimal::ZERO {
                continue;
            }

            let share_percent = (burden / spend * Decimal::from(100)).to_f64().unwrap_or(0.0);
            if share_percent < self.config.recurring_share_percent {
                continue;
            }

            let data = RecurringBurdenData {
                category: category.clone(),
                monthly_burden: burden,
                category_spend: spend,
                share_percent,
            };

            insights.push(
                Insight::new(
                    InsightType::Pattern,
                    Severity::Medium,
                    category.clone(),
                    format!("Recurring charges dominate {}", category),
                    format!(
                        "Recurring payees account for {:.0}% of {} spending ({} per month)",
                        share_percent,
                        category,
                        burden.round_dp(2)
                    ),
                )
                .with_impact(burden)
                .with_marker(InsightMarker::RecurringExpense)
                .with_data(serde_json::to_value(&data).unwrap_or_default()),
            );
        }
    }

    /// A savings warning that held last month and cleared this month
    fn achievements(
        &self,
        latest: &MonthlyCategoryAggregate,
        prior: &MonthlyCategoryAggregate,
        insights: &mut Vec<Insight>,
    ) {
        if !self.savings_below_floor(prior) || self.savings_below_floor(latest) {
            return;
        }

        let rate = latest.savings_rate();
        let data = SavingsRateData {
            income: latest.totals.income,
            expense: latest.totals.expense,
            rate,
            floor: self.config.savings_rate_floor,
        };

        insights.push(
            Insight::new(
                InsightType::Achievement,
                Severity::Low,
                "Savings",
                "Savings rate back on track",
                format!(
                    "You saved {:.1}% of your income this month, up from below target",
                    rate.unwrap_or(0.0) * 100.0
                ),
            )
            .with_data(serde_json::to_value(&data).unwrap_or_default()),
        );
    }
}

/// Most frequent category among a group's occurrences; ties resolve to the
/// alphabetically first so repeated runs agree
fn dominant_category(group: &RecurringGroup) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tx in &group.occurrences {
        *counts.entry(tx.category.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(category, _)| category.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, GroupStatistics, MonthTotals, Transaction};
    use crate::test_utils::{expense, month, monthly_expenses, today};
    use rust_decimal_macros::dec;

    fn expense_group(payee: &str, occurrences: Vec<Transaction>, average: Decimal) -> RecurringGroup {
        RecurringGroup {
            payee: payee.to_string(),
            kind: TransactionType::Expense,
            occurrences,
            frequency: Frequency::Monthly,
            statistics: GroupStatistics {
                min: average,
                max: average,
                average,
                trend_percent: 0.0,
            },
            confidence_score: 80.0,
            next_payment_date: Some(today()),
        }
    }

    #[test]
    fn test_single_month_yields_nothing() {
        let months = vec![month("2026-02", "3000", &[("Dining", "200")])];
        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_spending_change_detection() {
        let months = vec![
            month(
                "2026-01",
                "3000",
                &[("Dining", "100"), ("Transport", "100"), ("Groceries", "100")],
            ),
            month(
                "2026-02",
                "3000",
                &[("Dining", "150"), ("Transport", "40"), ("Groceries", "115")],
            ),
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        assert_eq!(insights.len(), 2);

        let dining = &insights[0];
        assert_eq!(dining.insight_type, InsightType::SpendingIncrease);
        assert_eq!(dining.category, "Dining");
        assert_eq!(dining.severity, Severity::Medium);
        assert_eq!(dining.impact.unwrap(), dec!(50));

        let transport = &insights[1];
        assert_eq!(transport.insight_type, InsightType::SpendingDecrease);
        assert_eq!(transport.severity, Severity::Medium);
    }

    #[test]
    fn test_change_severity_bands() {
        let months = vec![
            month(
                "2026-01",
                "3000",
                &[("A", "100"), ("B", "100"), ("C", "100")],
            ),
            month(
                "2026-02",
                "3000",
                &[("A", "125"), ("B", "150"), ("C", "200")],
            ),
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        assert_eq!(insights[0].severity, Severity::Low);
        assert_eq!(insights[1].severity, Severity::Medium);
        assert_eq!(insights[2].severity, Severity::High);
    }

    #[test]
    fn test_new_category_skipped() {
        let months = vec![
            month("2026-01", "3000", &[("Dining", "100")]),
            month("2026-02", "3000", &[("Dining", "100"), ("Pets", "500")]),
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_overspending_warns_high() {
        let months = vec![
            month("2026-01", "3000", &[("Rent", "1000")]),
            MonthlyCategoryAggregate {
                totals: MonthTotals {
                    income: dec!(2000),
                    expense: dec!(2500),
                },
                ..month("2026-02", "2000", &[("Rent", "1000")])
            },
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        let warning = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Warning)
            .unwrap();
        assert_eq!(warning.category, "Savings");
        assert_eq!(warning.severity, Severity::High);
        assert_eq!(warning.impact.unwrap(), dec!(500));
    }

    #[test]
    fn test_low_savings_rate_warns_medium() {
        let months = vec![
            month("2026-01", "3000", &[("Rent", "1000")]),
            MonthlyCategoryAggregate {
                totals: MonthTotals {
                    income: dec!(2000),
                    expense: dec!(1960),
                },
                ..month("2026-02", "2000", &[("Rent", "1000")])
            },
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        let warning = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Warning)
            .unwrap();
        // 2% savings rate, below the 5% floor but positive
        assert_eq!(warning.severity, Severity::Medium);
    }

    #[test]
    fn test_recurring_pattern_threshold() {
        let occurrences =
            monthly_expenses("NETFLIX.COM", "40.00", "Entertainment", "2025-12-01", 3, 1);
        let group = expense_group("NETFLIX.COM", occurrences, dec!(40.00));

        let months = vec![
            month("2026-01", "3000", &[("Entertainment", "70")]),
            month("2026-02", "3000", &[("Entertainment", "70")]),
        ];

        let insights = InsightGenerator::new().generate(&months, &[group.clone()], &[]);
        let pattern = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Pattern)
            .expect("pattern insight expected");
        assert_eq!(pattern.marker, Some(InsightMarker::RecurringExpense));
        assert_eq!(pattern.category, "Entertainment");

        // Well below the share threshold: no pattern insight
        let roomy = vec![
            month("2026-01", "3000", &[("Entertainment", "500")]),
            month("2026-02", "3000", &[("Entertainment", "500")]),
        ];
        let insights = InsightGenerator::new().generate(&roomy, &[group], &[]);
        assert!(insights
            .iter()
            .all(|i| i.insight_type != InsightType::Pattern));
    }

    #[test]
    fn test_achievement_after_recovery() {
        let months = vec![
            MonthlyCategoryAggregate {
                totals: MonthTotals {
                    income: dec!(2000),
                    expense: dec!(2500),
                },
                ..month("2026-01", "2000", &[("Rent", "1000")])
            },
            month("2026-02", "3000", &[("Rent", "1000")]),
        ];

        let insights = InsightGenerator::new().generate(&months, &[], &[]);
        let achievement = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Achievement)
            .expect("achievement expected");
        assert_eq!(achievement.category, "Savings");
    }

    #[test]
    fn test_anomaly_warnings_only_high() {
        let flag = |severity, id| AnomalyFlag {
            transaction: expense(id, "2026-02-10", "KROGER", "500", "Groceries"),
            category_mean: dec!(140),
            category_std_dev: 89.44,
            z_score: 4.02,
            deviation_percent: 257.1,
            severity,
        };

        let months = vec![
            month("2026-01", "3000", &[("Groceries", "500")]),
            month("2026-02", "3000", &[("Groceries", "500")]),
        ];

        let insights = InsightGenerator::new().generate(
            &months,
            &[],
            &[flag(Severity::High, 1), flag(Severity::Low, 2)],
        );
        let warnings: Vec<_> = insights
            .iter()
            .filter(|i| i.insight_type == InsightType::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].title.contains("Groceries"));
    }

    #[test]
    fn test_generation_order_is_stable() {
        let occurrences =
            monthly_expenses("NETFLIX.COM", "60.00", "Entertainment", "2025-12-01", 3, 1);
        let group = expense_group("NETFLIX.COM", occurrences, dec!(60.00));

        let months = vec![
            MonthlyCategoryAggregate {
                totals: MonthTotals {
                    income: dec!(2000),
                    expense: dec!(2500),
                },
                ..month("2026-01", "2000", &[("Dining", "100"), ("Entertainment", "80")])
            },
            month(
                "2026-02",
                "3000",
                &[("Dining", "200"), ("Entertainment", "80")],
            ),
        ];

        let insights = InsightGenerator::new().generate(&months, &[group], &[]);
        let types: Vec<InsightType> = insights.iter().map(|i| i.insight_type).collect();
        assert_eq!(
            types,
            vec![
                InsightType::SpendingIncrease,
                InsightType::Pattern,
                InsightType::Achievement,
            ]
        );
    }
}
