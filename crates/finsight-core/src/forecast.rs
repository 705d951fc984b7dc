//! Cash-flow projection
//!
//! Extrapolates detected recurring groups over a forward horizon and folds
//! them into a running balance. Only recurring obligations project: one-off
//! historical transactions are never hallucinated into the future.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{RecurringGroup, TransactionType};

/// Forecast bounds; tunable via [`crate::config::EngineConfig`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Hard cap on the requested horizon, keeping invocation cost bounded
    pub max_horizon_months: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_horizon_months: 24,
        }
    }
}

/// Resolution of the returned ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// A future occurrence extrapolated from a recurring group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTransaction {
    pub date: NaiveDate,
    pub payee: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Confidence score of the group the occurrence came from
    pub confidence: f64,
}

/// One entry of the projected ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    pub date: NaiveDate,
    /// Running balance at the end of this day or month
    pub balance: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
    pub transactions: Vec<ProjectedTransaction>,
}

/// First projected day on which the running balance goes negative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdraftRisk {
    pub date: NaiveDate,
    pub balance: Decimal,
    pub message: String,
}

/// Result of a forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub predictions: Vec<CashFlowPoint>,
    /// `None` when the balance never goes negative inside the horizon
    pub overdraft_risk: Option<OverdraftRisk>,
}

/// Projects recurring groups into a forward ledger
pub struct CashFlowForecaster {
    config: ForecastConfig,
}

impl Default for CashFlowForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl CashFlowForecaster {
    pub fn new() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Project `groups` forward from `today` and return the running ledger.
    ///
    /// Irregular groups never project. With nothing to project the balance
    /// carries forward flat and `overdraft_risk` is `None`.
    pub fn forecast(
        &self,
        current_balance: Decimal,
        groups: &[RecurringGroup],
        horizon_months: u32,
        granularity: Granularity,
        today: NaiveDate,
    ) -> CashFlowProjection {
        let horizon_months = horizon_months.min(self.config.max_horizon_months);
        if horizon_months == 0 {
            return CashFlowProjection {
                predictions: Vec::new(),
                overdraft_risk: None,
            };
        }

        let horizon_end = today
            .checked_add_months(Months::new(horizon_months))
            .expect("horizon within calendar range");

        let mut by_day = project_by_day(groups, today, horizon_end);

        let mut predictions = Vec::new();
        let mut overdraft_risk: Option<OverdraftRisk> = None;
        let mut balance = current_balance;

        let mut month_income = Decimal::ZERO;
        let mut month_expenses = Decimal::ZERO;
        let mut month_transactions: Vec<ProjectedTransaction> = Vec::new();

        let mut date = today + Duration::days(1);
        while date <= horizon_end {
            let day_transactions = by_day.remove(&date).unwrap_or_default();
            let mut day_income = Decimal::ZERO;
            let mut day_expenses = Decimal::ZERO;

            let balance_before = balance;
            for tx in &day_transactions {
                match tx.kind {
                    TransactionType::Income => {
                        day_income += tx.amount;
                        balance += tx.amount;
                    }
                    TransactionType::Expense => {
                        day_expenses += tx.amount;
                        balance -= tx.amount;
                    }
                }
            }

            if overdraft_risk.is_none() && balance_before >= Decimal::ZERO && balance < Decimal::ZERO
            {
                overdraft_risk = Some(OverdraftRisk {
                    date,
                    balance,
                    message: format!(
                        "Projected balance drops to {} on {}",
                        balance.round_dp(2),
                        date
                    ),
                });
            }

            match granularity {
                Granularity::Daily => {
                    predictions.push(CashFlowPoint {
                        date,
                        balance,
                        income: day_income,
                        expenses: day_expenses,
                        transactions: day_transactions,
                    });
                }
                Granularity::Monthly => {
                    month_income += day_income;
                    month_expenses += day_expenses;
                    month_transactions.extend(day_transactions);

                    if date == horizon_end || is_last_day_of_month(date) {
                        predictions.push(CashFlowPoint {
                            date,
                            balance,
                            income: std::mem::take(&mut month_income),
                            expenses: std::mem::take(&mut month_expenses),
                            transactions: std::mem::take(&mut month_transactions),
                        });
                    }
                }
            }

            date += Duration::days(1);
        }

        debug!(
            points = predictions.len(),
            overdraft = overdraft_risk.is_some(),
            "Cash-flow forecast complete"
        );

        CashFlowProjection {
            predictions,
            overdraft_risk,
        }
    }
}

/// Expand every non-irregular group into dated occurrences inside the
/// horizon, keyed by day
fn project_by_day(
    groups: &[RecurringGroup],
    today: NaiveDate,
    horizon_end: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<ProjectedTransaction>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<ProjectedTransaction>> = BTreeMap::new();

    for group in groups {
        let Some(interval) = group.frequency.interval_days() else {
            continue;
        };
        let Some(start) = group.next_payment_date else {
            continue;
        };

        let amount = group.statistics.average.round_dp(2);
        if amount.is_zero() {
            continue;
        }

        let mut date = start;
        while date <= today {
            date += Duration::days(interval);
        }
        while date <= horizon_end {
            by_day.entry(date).or_default().push(ProjectedTransaction {
                date,
                payee: group.payee.clone(),
                amount,
                kind: group.kind,
                confidence: group.confidence_score,
            });
            date += Duration::days(interval);
        }
    }

    // Same-day occurrences in payee order, independent of group input order
    for transactions in by_day.values_mut() {
        transactions.sort_by(|a, b| a.payee.cmp(&b.payee).then(a.kind.cmp(&b.kind)));
    }

    by_day
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    (date + Duration::days(1)).month() != date.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, GroupStatistics};
    use crate::test_utils::today;
    use rust_decimal_macros::dec;

    fn group(
        payee: &str,
        kind: TransactionType,
        frequency: Frequency,
        average: Decimal,
        next_payment: Option<&str>,
    ) -> RecurringGroup {
        RecurringGroup {
            payee: payee.to_string(),
            kind,
            occurrences: Vec::new(),
            frequency,
            statistics: GroupStatistics {
                min: average,
                max: average,
                average,
                trend_percent: 0.0,
            },
            confidence_score: 85.0,
            next_payment_date: next_payment
                .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        }
    }

    #[test]
    fn test_overdraft_on_first_negative_day() {
        let rent = group(
            "RENT",
            TransactionType::Expense,
            Frequency::Monthly,
            dec!(150),
            Some("2026-03-06"),
        );

        let projection =
            CashFlowForecaster::new().forecast(dec!(100), &[rent], 1, Granularity::Daily, today());

        let risk = projection.overdraft_risk.expect("overdraft expected");
        assert_eq!(risk.date, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        assert_eq!(risk.balance, dec!(-50));
        assert!(risk.message.contains("2026-03-06"));

        let payment_day = projection
            .predictions
            .iter()
            .find(|p| p.date == risk.date)
            .unwrap();
        assert_eq!(payment_day.expenses, dec!(150));
        assert_eq!(payment_day.balance, dec!(-50));
        assert_eq!(payment_day.transactions.len(), 1);
        assert_eq!(payment_day.transactions[0].confidence, 85.0);
    }

    #[test]
    fn test_no_groups_is_flat_with_null_risk() {
        let projection =
            CashFlowForecaster::new().forecast(dec!(500), &[], 2, Granularity::Monthly, today());

        // today() is 2026-03-01: month ends Mar 31 and Apr 30, horizon end May 1
        assert_eq!(projection.predictions.len(), 3);
        assert!(projection
            .predictions
            .iter()
            .all(|p| p.balance == dec!(500) && p.transactions.is_empty()));
        assert_eq!(projection.overdraft_risk, None);
    }

    #[test]
    fn test_irregular_groups_never_project() {
        let bakery = group(
            "CORNER BAKERY",
            TransactionType::Expense,
            Frequency::Irregular,
            dec!(8.40),
            None,
        );

        let projection =
            CashFlowForecaster::new().forecast(dec!(40), &[bakery], 1, Granularity::Daily, today());

        assert!(projection
            .predictions
            .iter()
            .all(|p| p.transactions.is_empty()));
        assert_eq!(projection.overdraft_risk, None);
    }

    #[test]
    fn test_income_offsets_expenses() {
        let salary = group(
            "ACME PAYROLL",
            TransactionType::Income,
            Frequency::Monthly,
            dec!(3000),
            Some("2026-03-15"),
        );
        let rent = group(
            "HILLSIDE APARTMENTS",
            TransactionType::Expense,
            Frequency::Monthly,
            dec!(2000),
            Some("2026-03-20"),
        );

        let projection = CashFlowForecaster::new().forecast(
            dec!(100),
            &[salary, rent],
            1,
            Granularity::Monthly,
            today(),
        );

        assert_eq!(projection.overdraft_risk, None);
        let march = &projection.predictions[0];
        assert_eq!(march.date, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        assert_eq!(march.income, dec!(3000));
        assert_eq!(march.expenses, dec!(2000));
        assert_eq!(march.balance, dec!(1100));
        assert_eq!(march.transactions.len(), 2);
    }

    #[test]
    fn test_overdraft_date_exact_under_monthly_granularity() {
        let rent = group(
            "RENT",
            TransactionType::Expense,
            Frequency::Monthly,
            dec!(150),
            Some("2026-03-06"),
        );

        let projection = CashFlowForecaster::new().forecast(
            dec!(100),
            &[rent],
            1,
            Granularity::Monthly,
            today(),
        );

        // The ledger is monthly but the risk date is the exact payment day
        let risk = projection.overdraft_risk.unwrap();
        assert_eq!(risk.date, NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[test]
    fn test_negative_start_is_not_an_overdraft_event() {
        let rent = group(
            "RENT",
            TransactionType::Expense,
            Frequency::Monthly,
            dec!(150),
            Some("2026-03-06"),
        );

        let projection = CashFlowForecaster::new().forecast(
            dec!(-25),
            &[rent],
            1,
            Granularity::Daily,
            today(),
        );
        assert_eq!(projection.overdraft_risk, None);
    }

    #[test]
    fn test_horizon_clamped() {
        let config = ForecastConfig {
            max_horizon_months: 1,
        };
        let salary = group(
            "ACME PAYROLL",
            TransactionType::Income,
            Frequency::Monthly,
            dec!(3000),
            Some("2026-03-15"),
        );

        let projection = CashFlowForecaster::with_config(config).forecast(
            dec!(0),
            &[salary],
            12,
            Granularity::Daily,
            today(),
        );

        let last = projection.predictions.last().unwrap();
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let projection =
            CashFlowForecaster::new().forecast(dec!(100), &[], 0, Granularity::Daily, today());
        assert!(projection.predictions.is_empty());
        assert_eq!(projection.overdraft_risk, None);
    }
}
