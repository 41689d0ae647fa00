use std::collections::BTreeMap;

use crate::core::cost::pricing::PricingTable;
use crate::core::error::UsageError;
use crate::core::models::cost::{
    DailyCostSummary, DailyModelCosts, ModelCostBreakdown, WhisperCostBreakdown,
};
use crate::core::models::usage::{AudioUsageEntry, RawUsagePayload, TokenUsageEntry};

pub const DEFAULT_AUDIO_MODEL: &str = "whisper-1";

/// Turns raw usage records into dollar costs.
#[derive(Debug, Clone)]
pub struct CostCalculator<'a> {
    pricing: &'a PricingTable,
    audio_model: String,
}

#[derive(Default)]
struct TokenTotals {
    context: u64,
    generated: u64,
}

impl<'a> CostCalculator<'a> {
    /// `audio_model` names the rate used for transcription seconds.
    pub fn new(pricing: &'a PricingTable, audio_model: impl Into<String>) -> Self {
        Self {
            pricing,
            audio_model: audio_model.into(),
        }
    }

    /// Group token entries by snapshot id and price each model.
    ///
    /// Any unpriced model fails the whole computation.
    pub fn compute_model_costs(
        &self,
        entries: &[TokenUsageEntry],
    ) -> Result<DailyModelCosts, UsageError> {
        let mut per_model: BTreeMap<&str, TokenTotals> = BTreeMap::new();
        for entry in entries {
            let totals = per_model.entry(entry.snapshot_id.as_str()).or_default();
            totals.context += entry.context_tokens;
            totals.generated += entry.generated_tokens;
        }

        let mut models = BTreeMap::new();
        for (model, totals) in per_model {
            let rate = self.pricing.lookup(model)?;
            let per_tokens = rate.token_divisor(model)?;
            let generated_rate = rate.generated_rate_for(model)?;
            let context_token_cost = totals.context as f64 * rate.context_rate / per_tokens;
            let generated_token_cost = totals.generated as f64 * generated_rate / per_tokens;
            models.insert(
                model.to_string(),
                ModelCostBreakdown {
                    context_token_cost,
                    generated_token_cost,
                    total_cost: context_token_cost + generated_token_cost,
                },
            );
        }

        let total_costs = models.values().map(|m| m.total_cost).sum();
        Ok(DailyModelCosts {
            models,
            total_costs,
        })
    }

    /// Price audio transcription seconds with the audio model's rate.
    pub fn compute_whisper_costs(
        &self,
        entries: &[AudioUsageEntry],
    ) -> Result<WhisperCostBreakdown, UsageError> {
        if entries.is_empty() {
            return Ok(WhisperCostBreakdown::default());
        }
        let total_seconds: u64 = entries.iter().map(|e| e.num_seconds).sum();
        let rate = self.pricing.lookup(&self.audio_model)?;
        let per_minutes = rate.minute_divisor(&self.audio_model)?;
        let total_costs = (total_seconds as f64 / (per_minutes * 60.0)) * rate.context_rate;
        Ok(WhisperCostBreakdown {
            total_seconds,
            total_costs,
        })
    }

    pub fn compute_daily(&self, payload: &RawUsagePayload) -> Result<DailyCostSummary, UsageError> {
        let model_costs = self.compute_model_costs(&payload.token_entries)?;
        let whisper_costs = self.compute_whisper_costs(&payload.audio_entries)?;
        Ok(DailyCostSummary::new(model_costs, whisper_costs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn table() -> PricingTable {
        PricingTable::from_json(
            r#"{
                "gpt-4-0613": { "context": 0.03, "generated": 0.06, "per_tokens": 1000 },
                "gpt-3.5-turbo-0613": { "context": 0.0015, "generated": 0.002, "per_tokens": 1000 },
                "whisper-1": { "context": 0.006, "per_minutes": 1 }
            }"#,
        )
        .unwrap()
    }

    fn token(model: &str, context: u64, generated: u64) -> TokenUsageEntry {
        TokenUsageEntry {
            snapshot_id: model.to_string(),
            context_tokens: context,
            generated_tokens: generated,
            n_requests: None,
            operation: None,
            aggregation_timestamp: None,
        }
    }

    fn audio(seconds: u64) -> AudioUsageEntry {
        AudioUsageEntry {
            num_seconds: seconds,
            model_id: None,
            num_requests: None,
            timestamp: None,
        }
    }

    #[test]
    fn gpt4_single_entry() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let costs = calc
            .compute_model_costs(&[token("gpt-4-0613", 1000, 500)])
            .unwrap();
        let gpt4 = &costs.models["gpt-4-0613"];
        assert!((gpt4.context_token_cost - 0.03).abs() < 1e-9);
        assert!((gpt4.generated_token_cost - 0.03).abs() < 1e-9);
        assert!((gpt4.total_cost - 0.06).abs() < 1e-9);
        assert!((costs.total_costs - 0.06).abs() < 1e-9);
    }

    #[test]
    fn entries_are_grouped_per_model() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let costs = calc
            .compute_model_costs(&[
                token("gpt-4-0613", 500, 250),
                token("gpt-3.5-turbo-0613", 2000, 1000),
                token("gpt-4-0613", 500, 250),
            ])
            .unwrap();
        assert_eq!(costs.models.len(), 2);
        assert!((costs.models["gpt-4-0613"].total_cost - 0.06).abs() < 1e-9);
        // 2000 * 0.0015 / 1000 + 1000 * 0.002 / 1000
        assert!((costs.models["gpt-3.5-turbo-0613"].total_cost - 0.005).abs() < 1e-9);
        assert!((costs.total_costs - 0.065).abs() < 1e-9);
    }

    #[test]
    fn empty_entries_yield_zero() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let costs = calc.compute_model_costs(&[]).unwrap();
        assert!(costs.models.is_empty());
        assert_eq!(costs.total_costs, 0.0);
    }

    #[test]
    fn unknown_model_fails_whole_day() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let err = calc
            .compute_model_costs(&[
                token("gpt-4-0613", 1000, 500),
                token("text-davinci-003", 10, 10),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownModel);
    }

    #[test]
    fn whisper_two_minutes() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let costs = calc
            .compute_whisper_costs(&[audio(45), audio(75)])
            .unwrap();
        assert_eq!(costs.total_seconds, 120);
        assert!((costs.total_costs - 0.012).abs() < 1e-9);
    }

    #[test]
    fn whisper_empty_is_zero_without_lookup() {
        let pricing = PricingTable::default();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let costs = calc.compute_whisper_costs(&[]).unwrap();
        assert_eq!(costs.total_seconds, 0);
        assert_eq!(costs.total_costs, 0.0);
    }

    #[test]
    fn whisper_without_audio_rate_is_unknown_model() {
        let pricing = PricingTable::from_json(
            r#"{ "gpt-4-0613": { "context": 0.03, "generated": 0.06, "per_tokens": 1000 } }"#,
        )
        .unwrap();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let err = calc.compute_whisper_costs(&[audio(60)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownModel);
    }

    #[test]
    fn audio_model_used_for_tokens_is_config_error() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let err = calc
            .compute_model_costs(&[token("whisper-1", 10, 0)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn custom_audio_model() {
        let pricing = PricingTable::from_json(
            r#"{ "whisper-2": { "context": 0.012, "per_minutes": 1 } }"#,
        )
        .unwrap();
        let calc = CostCalculator::new(&pricing, "whisper-2");
        let costs = calc.compute_whisper_costs(&[audio(30)]).unwrap();
        assert!((costs.total_costs - 0.006).abs() < 1e-9);
    }

    #[test]
    fn daily_total_is_sum_of_parts() {
        let pricing = table();
        let calc = CostCalculator::new(&pricing, DEFAULT_AUDIO_MODEL);
        let payload = RawUsagePayload {
            token_entries: vec![token("gpt-4-0613", 1000, 500)],
            audio_entries: vec![audio(120)],
        };
        let day = calc.compute_daily(&payload).unwrap();
        assert!((day.total_costs - 0.072).abs() < 1e-9);
        assert!(
            (day.total_costs - (day.model_costs.total_costs + day.whisper_costs.total_costs)).abs()
                < 1e-9
        );
    }
}
