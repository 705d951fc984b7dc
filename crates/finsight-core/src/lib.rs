//! Finsight Core Library
//!
//! The analysis engine behind a personal finance tracker:
//! - Recurring obligation detection over raw transaction windows
//! - Day-by-day cash-flow projection with overdraft warnings
//! - Statistical outlier flagging per spending category
//! - Typed insights over monthly aggregates
//! - Deterministic rule-based recommendations
//!
//! Every component is a pure, synchronous function of the transaction
//! window it is handed (plus an injected "today" anchor). The engine does
//! no I/O, keeps no state between invocations, and can run concurrently
//! for different users without coordination.

pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod insights;
pub mod models;
pub mod recommend;
pub mod recurring;

/// Deterministic fixture builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::aggregate_monthly;
pub use anomaly::{AnomalyConfig, AnomalyDetector};
pub use config::EngineConfig;
pub use engine::{AnalysisEngine, AnalysisReport, InsightReport};
pub use error::{Error, Result};
pub use forecast::{
    CashFlowForecaster, CashFlowPoint, CashFlowProjection, ForecastConfig, Granularity,
    OverdraftRisk, ProjectedTransaction,
};
pub use insights::{
    Insight, InsightConfig, InsightGenerator, InsightMarker, InsightType,
};
pub use models::{
    sanitize_transactions, AnomalyFlag, Frequency, GroupStatistics, MonthTotals,
    MonthlyCategoryAggregate, RawTransaction, RecurringGroup, Severity, Transaction,
    TransactionType,
};
pub use recommend::{
    Difficulty, Impact, Recommendation, RecommendationConfig, RecommendationEngine,
};
pub use recurring::{RecurringConfig, RecurringPatternDetector};
