//! Rule-based recommendations
//!
//! A pure transform of insights plus current-month aggregates into
//! actionable recommendation records. Dispatch is an ordered rule table
//! evaluated in a fixed sequence, so output order is a contract rather than
//! an accident: per-insight rules first (in insight order), then the
//! concentration rules, the emergency-fund rule, and the goal rules.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::insights::types::{Insight, InsightMarker, InsightType, Severity};
use crate::models::MonthlyCategoryAggregate;

/// Effort required to act on a recommendation. Variant names are English;
/// the serialized labels are the French wire values the product displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Facile")]
    Easy,
    #[serde(rename = "Moyenne")]
    Medium,
    #[serde(rename = "Difficile")]
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Facile",
            Self::Medium => "Moyenne",
            Self::Hard => "Difficile",
        }
    }
}

/// Expected financial upside of following a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    #[serde(rename = "Moyen")]
    Medium,
    #[serde(rename = "Élevé")]
    High,
    #[serde(rename = "Très élevé")]
    VeryHigh,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "Moyen",
            Self::High => "Élevé",
            Self::VeryHigh => "Très élevé",
        }
    }
}

/// An actionable suggestion derived from insights and aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub potential_impact: Impact,
    /// Concrete plan; never empty for an emitted recommendation
    pub steps: Vec<String>,
}

/// Concentration thresholds; tunable via [`crate::config::EngineConfig`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Share of total expense (percent) above which a category is
    /// considered concentrated
    pub concentration_share_percent: f64,
    /// Absolute spend a concentrated category must also exceed
    pub concentration_floor: Decimal,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            concentration_share_percent: 40.0,
            concentration_floor: Decimal::from(300),
        }
    }
}

/// One entry of the ordered per-insight rule table
struct InsightRule {
    matches: fn(&Insight) -> bool,
    build: fn(&Insight) -> Recommendation,
}

/// Per-insight rules in evaluation order. A single insight fires at most
/// once per rule; several rules may fire on the same insight.
const INSIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        matches: is_medium_spending_increase,
        build: reduce_spending,
    },
    InsightRule {
        matches: is_savings_warning,
        build: raise_savings_rate,
    },
    InsightRule {
        matches: is_recurring_pattern,
        build: optimize_recurring,
    },
];

fn is_medium_spending_increase(insight: &Insight) -> bool {
    insight.insight_type == InsightType::SpendingIncrease && insight.severity == Severity::Medium
}

fn is_savings_warning(insight: &Insight) -> bool {
    insight.insight_type == InsightType::Warning && insight.category == "Savings"
}

fn is_recurring_pattern(insight: &Insight) -> bool {
    insight.insight_type == InsightType::Pattern
        && insight.marker == Some(InsightMarker::RecurringExpense)
}

fn reduce_spending(insight: &Insight) -> Recommendation {
    let category = &insight.category;
    Recommendation {
        title: format!("Reduce spending in {}", category),
        description: format!(
            "{} spending rose noticeably last month; bringing it back down frees up cash flow",
            category
        ),
        difficulty: Difficulty::Medium,
        potential_impact: Impact::High,
        steps: vec![
            format!("Review every {} transaction from the last two months", category),
            format!("Set a monthly {} budget below the previous month's level", category),
            format!("Replace the three largest {} expenses with cheaper alternatives", category),
            format!("Track {} spending weekly until the next monthly review", category),
        ],
    }
}

fn raise_savings_rate(_insight: &Insight) -> Recommendation {
    Recommendation {
        title: "Raise your savings rate".to_string(),
        description: "Your savings rate is below target; small automatic changes compound quickly"
            .to_string(),
        difficulty: Difficulty::Medium,
        potential_impact: Impact::VeryHigh,
        steps: vec![
            "Schedule an automatic transfer to savings on payday".to_string(),
            "Renegotiate or cancel one fixed charge this month".to_string(),
            "Cap discretionary spending at 30% of income".to_string(),
            "Review the rate again after two pay cycles".to_string(),
        ],
    }
}

fn optimize_recurring(insight: &Insight) -> Recommendation {
    let category = &insight.category;
    Recommendation {
        title: format!("Optimize recurring spend in {}", category),
        description: format!(
            "Recurring charges make up most of your {} spending; they are the easiest place to cut",
            category
        ),
        difficulty: Difficulty::Medium,
        potential_impact: Impact::High,
        steps: vec![
            format!("List every recurring {} charge with its monthly cost", category),
            "Cancel the ones you have not used in the last month".to_string(),
            "Switch annual billing on the ones you keep".to_string(),
            "Set a calendar reminder to repeat this audit quarterly".to_string(),
        ],
    }
}

fn diversify_spending(category: &str, amount: Decimal, share_percent: f64) -> Recommendation {
    Recommendation {
        title: format!("Diversify spending in {}", category),
        description: format!(
            "{} takes {:.0}% of your monthly expenses ({}); that concentration makes your budget fragile",
            category,
            share_percent,
            amount.round_dp(2)
        ),
        difficulty: Difficulty::Hard,
        potential_impact: Impact::Medium,
        steps: vec![
            format!("Break down what the {} total is made of", category),
            "Negotiate or re-shop the single largest item".to_string(),
            format!("Set a ceiling for {} as a share of total spending", category),
        ],
    }
}

fn emergency_fund() -> Recommendation {
    Recommendation {
        title: "Build an emergency fund".to_string(),
        description:
            "Three months of expenses in a separate account absorbs shocks before they become debt"
                .to_string(),
        difficulty: Difficulty::Medium,
        potential_impact: Impact::VeryHigh,
        steps: vec![
            "Open a dedicated savings account".to_string(),
            "Start with one week of expenses as the first milestone".to_string(),
            "Automate a monthly contribution".to_string(),
            "Stop at three months of expenses and redirect the surplus".to_string(),
        ],
    }
}

fn define_smart_goals() -> Recommendation {
    Recommendation {
        title: "Define SMART financial goals".to_string(),
        description: "Without a specific, measurable goal, saving has no finish line".to_string(),
        difficulty: Difficulty::Easy,
        potential_impact: Impact::VeryHigh,
        steps: vec![
            "Pick one concrete objective with an amount and a date".to_string(),
            "Divide it into monthly contributions".to_string(),
            "Track progress at the end of each month".to_string(),
        ],
    }
}

fn accelerate_goal_progress() -> Recommendation {
    Recommendation {
        title: "Accelerate your goal progress".to_string(),
        description: "One or more goals are behind schedule; a small raise in contributions catches up"
            .to_string(),
        difficulty: Difficulty::Medium,
        potential_impact: Impact::High,
        steps: vec![
            "Identify which goals are behind and by how much".to_string(),
            "Raise their monthly contribution by 10%".to_string(),
            "Push the deadline only if the raised contribution still falls short".to_string(),
        ],
    }
}

/// Turns insights plus aggregates into an ordered recommendation list
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            config: RecommendationConfig::default(),
        }
    }

    pub fn with_config(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Evaluate the rule table against `insights` and the latest month of
    /// `months` (oldest first). Pure: no I/O, no randomness, no state.
    ///
    /// Returns an empty list when there are no insights or fewer than two
    /// months of aggregates - the same insufficient-data policy the insight
    /// generator applies.
    pub fn generate_recommendations(
        &self,
        insights: &[Insight],
        months: &[MonthlyCategoryAggregate],
    ) -> Vec<Recommendation> {
        if months.len() < 2 || insights.is_empty() {
            return Vec::new();
        }

        let mut recommendations = Vec::new();

        for insight in insights {
            for rule in INSIGHT_RULES {
                if (rule.matches)(insight) {
                    recommendations.push((rule.build)(insight));
                }
            }
        }

        if let Some(current) = months.last() {
            self.concentration_rules(current, &mut recommendations);

            if current.totals.income > Decimal::ZERO {
                recommendations.push(emergency_fund());
            }
        }

        self.goal_rules(insights, &mut recommendations);

        debug!(
            recommendations = recommendations.len(),
            "Recommendation generation complete"
        );
        recommendations
    }

    /// One diversification recommendation per concentrated category, in
    /// category iteration order. The share check runs before the absolute
    /// floor; both must hold.
    fn concentration_rules(
        &self,
        current: &MonthlyCategoryAggregate,
        recommendations: &mut Vec<Recommendation>,
    ) {
        let total = current.totals.expense;
        if total <= Decimal::ZERO {
            return;
        }

        for (category, amount) in &current.categories {
            let share_percent = (*amount / total * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0);
            if share_percent <= self.config.concentration_share_percent {
                continue;
            }
            if *amount <= self.config.concentration_floor {
                continue;
            }

            recommendations.push(diversify_spending(category, *amount, share_percent));
        }
    }

    /// Goal rules over insights in the "Goals" category. Any number of
    /// slow-progress markers collapses into a single recommendation.
    fn goal_rules(&self, insights: &[Insight], recommendations: &mut Vec<Recommendation>) {
        let goal_insights: Vec<&Insight> = insights
            .iter()
            .filter(|i| i.category == "Goals")
            .collect();

        if goal_insights
            .iter()
            .any(|i| i.marker == Some(InsightMarker::NoGoalsDefined))
        {
            recommendations.push(define_smart_goals());
        }

        if goal_insights
            .iter()
            .any(|i| i.marker == Some(InsightMarker::SlowGoalProgress))
        {
            recommendations.push(accelerate_goal_progress());
        }
    }
}
