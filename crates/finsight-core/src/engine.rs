//! Analysis pipeline facade
//!
//! Wires the components in their dependency order: detector first, then the
//! anomaly/insight/forecast stages over its output, then recommendations
//! over the insights. Each method is a pure function of the supplied
//! transaction window and the injected `today` anchor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::aggregate::aggregate_monthly;
use crate::anomaly::AnomalyDetector;
use crate::config::EngineConfig;
use crate::forecast::{CashFlowForecaster, CashFlowProjection, Granularity};
use crate::insights::{Insight, InsightGenerator};
use crate::models::{AnomalyFlag, MonthlyCategoryAggregate, RecurringGroup, Transaction};
use crate::recommend::{Recommendation, RecommendationEngine};
use crate::recurring::RecurringPatternDetector;

/// Insights plus the recommendations derived from the same window - the
/// shape the product's advisor endpoint serves
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

/// Everything the pipeline derives from one transaction window
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub months: Vec<MonthlyCategoryAggregate>,
    pub recurring: Vec<RecurringGroup>,
    pub anomalies: Vec<AnomalyFlag>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

/// The assembled engine
pub struct AnalysisEngine {
    detector: RecurringPatternDetector,
    anomalies: AnomalyDetector,
    forecaster: CashFlowForecaster,
    generator: InsightGenerator,
    recommender: RecommendationEngine,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            detector: RecurringPatternDetector::with_config(config.recurring),
            anomalies: AnomalyDetector::with_config(config.anomaly),
            forecaster: CashFlowForecaster::with_config(config.forecast),
            generator: InsightGenerator::with_config(config.insights),
            recommender: RecommendationEngine::with_config(config.recommendations),
        }
    }

    /// Recurring payee groups in a window (the bills list)
    pub fn recurring_groups(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Vec<RecurringGroup> {
        self.detector.detect(transactions, today)
    }

    /// Statistical outliers in a window
    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> Vec<AnomalyFlag> {
        self.anomalies.detect_anomalies(transactions)
    }

    /// Detect recurring groups in the window and project them forward from
    /// `current_balance`
    pub fn cash_flow(
        &self,
        current_balance: Decimal,
        transactions: &[Transaction],
        horizon_months: u32,
        granularity: Granularity,
        today: NaiveDate,
    ) -> CashFlowProjection {
        let groups = self.detector.detect(transactions, today);
        self.forecaster
            .forecast(current_balance, &groups, horizon_months, granularity, today)
    }

    /// Insights and recommendations for one window
    pub fn insight_report(&self, transactions: &[Transaction], today: NaiveDate) -> InsightReport {
        let report = self.report(transactions, today);
        InsightReport {
            insights: report.insights,
            recommendations: report.recommendations,
        }
    }

    /// Run the full pipeline over one window
    pub fn report(&self, transactions: &[Transaction], today: NaiveDate) -> AnalysisReport {
        let months = aggregate_monthly(transactions);
        let recurring = self.detector.detect(transactions, today);
        let anomalies = self.anomalies.detect_anomalies(transactions);
        let insights = self.generator.generate(&months, &recurring, &anomalies);
        let recommendations = self
            .recommender
            .generate_recommendations(&insights, &months);

        info!(
            transactions = transactions.len(),
            months = months.len(),
            recurring = recurring.len(),
            anomalies = anomalies.len(),
            insights = insights.len(),
            recommendations = recommendations.len(),
            "Analysis complete"
        );

        AnalysisReport {
            months,
            recurring,
            anomalies,
            insights,
            recommendations,
        }
    }
}
