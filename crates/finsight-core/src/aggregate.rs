//! Monthly category aggregation
//!
//! Folds a transaction window into one [`MonthlyCategoryAggregate`] per
//! calendar month, the unit the insight generator and recommendation engine
//! operate over.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{MonthTotals, MonthlyCategoryAggregate, Transaction, TransactionType};

/// First day of the month a date falls in
pub fn month_of(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 always valid")
}

/// Aggregate a transaction window by calendar month, oldest month first.
///
/// Expenses contribute to both the per-category map and the expense total;
/// income contributes only to the income total (category shares are a
/// spending concept).
pub fn aggregate_monthly(transactions: &[Transaction]) -> Vec<MonthlyCategoryAggregate> {
    let mut months: BTreeMap<NaiveDate, MonthlyCategoryAggregate> = BTreeMap::new();

    for tx in transactions {
        let month = month_of(tx.date);
        let entry = months
            .entry(month)
            .or_insert_with(|| MonthlyCategoryAggregate {
                month,
                categories: BTreeMap::new(),
                totals: MonthTotals::default(),
            });

        match tx.kind {
            TransactionType::Income => {
                entry.totals.income += tx.amount;
            }
            TransactionType::Expense => {
                entry.totals.expense += tx.amount;
                *entry
                    .categories
                    .entry(tx.category.clone())
                    .or_insert(Decimal::ZERO) += tx.amount;
            }
        }
    }

    months.into_values().collect()
}
