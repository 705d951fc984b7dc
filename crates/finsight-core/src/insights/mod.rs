//! Insight generation - typed observations about spending behavior
//!
//! Consumes monthly aggregates plus the recurring and anomaly signals and
//! produces severity-ranked, machine-taggable insights:
//!
//! - **Spending change** - a category moved sharply month over month
//! - **Warning** - savings rate below target, or an outlier charge
//! - **Pattern** - recurring obligations dominate a category
//! - **Achievement** - a warned condition resolved favorably
//!
//! ## Usage
//!
//! ```rust,ignore
//! use finsight_core::insights::InsightGenerator;
//!
//! let generator = InsightGenerator::new();
//! let insights = generator.generate(&months, &groups, &anomalies);
//! ```

pub mod generator;
pub mod types;

pub use generator::{InsightConfig, InsightGenerator};
pub use types::{
    AnomalyWarningData, Insight, InsightMarker, InsightType, RecurringBurdenData, SavingsRateData,
    Severity, SpendingChangeData,
};
