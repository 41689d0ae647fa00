use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::ErrorKind;

/// Cost of one model's usage over a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCostBreakdown {
    pub context_token_cost: f64,
    pub generated_token_cost: f64,
    pub total_cost: f64,
}

/// Per-model costs for a day, serialized as one object with a `total_costs` key
/// alongside the model ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyModelCosts {
    #[serde(flatten)]
    pub models: BTreeMap<String, ModelCostBreakdown>,
    pub total_costs: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhisperCostBreakdown {
    pub total_seconds: u64,
    pub total_costs: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyCostSummary {
    pub total_costs: f64,
    pub model_costs: DailyModelCosts,
    pub whisper_costs: WhisperCostBreakdown,
}

impl DailyCostSummary {
    /// Combine both breakdowns; the total is always their exact sum.
    pub fn new(model_costs: DailyModelCosts, whisper_costs: WhisperCostBreakdown) -> Self {
        Self {
            total_costs: model_costs.total_costs + whisper_costs.total_costs,
            model_costs,
            whisper_costs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayError {
    pub kind: ErrorKind,
    pub message: String,
}

/// What a single date resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayRecord {
    Failed { error: DayError },
    Summary(DailyCostSummary),
}

impl DayRecord {
    pub fn summary(&self) -> Option<&DailyCostSummary> {
        match self {
            Self::Summary(s) => Some(s),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DayError> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Summary(_) => None,
        }
    }
}

/// ISO date (`YYYY-MM-DD`) → day record, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyUsage {
    days: BTreeMap<String, DayRecord>,
}

impl MonthlyUsage {
    pub(crate) fn insert(&mut self, date: String, record: DayRecord) {
        self.days.insert(date, record);
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DayRecord)> {
        self.days.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sum of every successfully computed day.
    pub fn total_costs(&self) -> f64 {
        self.days
            .values()
            .filter_map(DayRecord::summary)
            .map(|s| s.total_costs)
            .sum()
    }

    pub fn whisper_totals(&self) -> WhisperCostBreakdown {
        self.days
            .values()
            .filter_map(DayRecord::summary)
            .fold(WhisperCostBreakdown::default(), |mut acc, s| {
                acc.total_seconds += s.whisper_costs.total_seconds;
                acc.total_costs += s.whisper_costs.total_costs;
                acc
            })
    }

    /// Per-model sums across the month.
    pub fn model_totals(&self) -> BTreeMap<String, ModelCostBreakdown> {
        let mut totals: BTreeMap<String, ModelCostBreakdown> = BTreeMap::new();
        for summary in self.days.values().filter_map(DayRecord::summary) {
            for (model, cost) in &summary.model_costs.models {
                let entry = totals.entry(model.clone()).or_default();
                entry.context_token_cost += cost.context_token_cost;
                entry.generated_token_cost += cost.generated_token_cost;
                entry.total_cost += cost.total_cost;
            }
        }
        totals
    }

    pub fn failed_days(&self) -> Vec<(&str, &DayError)> {
        self.days
            .iter()
            .filter_map(|(date, r)| r.error().map(|e| (date.as_str(), e)))
            .collect()
    }
}
