//! Test fixtures for finsight-core
//!
//! Deterministic builders for transactions and monthly aggregates. Nothing
//! here reads the clock: the shared [`today`] anchor keeps every test
//! reproducible.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{MonthTotals, MonthlyCategoryAggregate, Transaction, TransactionType};

/// Fixed "now" used across tests
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn amount(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn tx(
    id: i64,
    when: &str,
    description: &str,
    value: &str,
    kind: TransactionType,
    category: &str,
) -> Transaction {
    Transaction {
        id,
        date: date(when),
        description: description.to_string(),
        amount: amount(value),
        kind,
        category: category.to_string(),
        note: None,
    }
}

pub fn expense(id: i64, when: &str, description: &str, value: &str, category: &str) -> Transaction {
    tx(id, when, description, value, TransactionType::Expense, category)
}

pub fn income(id: i64, when: &str, description: &str, value: &str) -> Transaction {
    tx(id, when, description, value, TransactionType::Income, "Income")
}

/// `count` expense occurrences of the same payee, exactly 30 days apart
pub fn monthly_expenses(
    payee: &str,
    value: &str,
    category: &str,
    start: &str,
    count: usize,
    base_id: i64,
) -> Vec<Transaction> {
    let first = date(start);
    (0..count)
        .map(|i| {
            let day = first + Duration::days(30 * i as i64);
            expense(
                base_id + i as i64,
                &day.format("%Y-%m-%d").to_string(),
                payee,
                value,
                category,
            )
        })
        .collect()
}

/// A monthly aggregate from an income figure and per-category expenses;
/// `ym` is `YYYY-MM`
pub fn month(
    ym: &str,
    income_total: &str,
    categories: &[(&str, &str)],
) -> MonthlyCategoryAggregate {
    let mut map = BTreeMap::new();
    let mut expense_total = Decimal::ZERO;
    for (name, value) in categories {
        let value = amount(value);
        expense_total += value;
        map.insert(name.to_string(), value);
    }

    MonthlyCategoryAggregate {
        month: date(&format!("{}-01", ym)),
        categories: map,
        totals: MonthTotals {
            income: amount(income_total),
            expense: expense_total,
        },
    }
}
