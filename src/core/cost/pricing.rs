use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{ConfigError, UsageError};

/// Per-model rates in dollars.
///
/// Token models charge `context` / `generated` per `per_tokens` tokens. Audio models
/// charge `context` per `per_minutes` minutes of audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSpec {
    #[serde(rename = "context")]
    pub context_rate: f64,
    /// Required for token models; audio-only entries may omit it.
    #[serde(rename = "generated", default, skip_serializing_if = "Option::is_none")]
    pub generated_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_tokens: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_minutes: Option<f64>,
}

impl RateSpec {
    fn validate(&self, model: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRate {
            model: model.to_string(),
            reason: reason.to_string(),
        };
        if !self.context_rate.is_finite() || self.context_rate < 0.0 {
            return Err(invalid("context rate must be a non-negative number"));
        }
        if let Some(generated) = self.generated_rate {
            if !generated.is_finite() || generated < 0.0 {
                return Err(invalid("generated rate must be a non-negative number"));
            }
        }
        if self.per_tokens.is_some() && self.generated_rate.is_none() {
            return Err(invalid("generated rate is required alongside per_tokens"));
        }
        match (self.per_tokens, self.per_minutes) {
            (None, None) => return Err(invalid("one of per_tokens or per_minutes is required")),
            (Some(t), _) if !(t.is_finite() && t > 0.0) => {
                return Err(invalid("per_tokens must be positive"))
            }
            (_, Some(m)) if !(m.is_finite() && m > 0.0) => {
                return Err(invalid("per_minutes must be positive"))
            }
            _ => {}
        }
        Ok(())
    }

    /// Token divisor, required when pricing token usage.
    pub fn token_divisor(&self, model: &str) -> Result<f64, ConfigError> {
        self.per_tokens.ok_or_else(|| ConfigError::InvalidRate {
            model: model.to_string(),
            reason: "per_tokens is required to price token usage".to_string(),
        })
    }

    /// Generated-token rate, required when pricing token usage.
    pub fn generated_rate_for(&self, model: &str) -> Result<f64, ConfigError> {
        self.generated_rate.ok_or_else(|| ConfigError::InvalidRate {
            model: model.to_string(),
            reason: "generated rate is required to price token usage".to_string(),
        })
    }

    /// Minute divisor, required when pricing audio usage.
    pub fn minute_divisor(&self, model: &str) -> Result<f64, ConfigError> {
        self.per_minutes.ok_or_else(|| ConfigError::InvalidRate {
            model: model.to_string(),
            reason: "per_minutes is required to price audio usage".to_string(),
        })
    }
}

/// Model id → rate lookup. Built once and shared read-only for the whole run.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    rates: BTreeMap<String, RateSpec>,
}

impl PricingTable {
    /// Load a pricing table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingPricing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), models = table.len(), "Loaded pricing table");
        Ok(table)
    }

    /// Parse a JSON object of `model -> { context, generated, per_tokens, per_minutes? }`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let rates: BTreeMap<String, RateSpec> = serde_json::from_str(json)?;
        Self::from_rates(rates)
    }

    pub fn from_rates(rates: BTreeMap<String, RateSpec>) -> Result<Self, ConfigError> {
        for (model, rate) in &rates {
            rate.validate(model)?;
        }
        Ok(Self { rates })
    }

    /// Look up the rate for an exact model id. Unpriced models are an error, never zero.
    pub fn lookup(&self, model: &str) -> Result<&RateSpec, UsageError> {
        self.rates
            .get(model)
            .ok_or_else(|| UsageError::UnknownModel(model.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = (&str, &RateSpec)> {
        self.rates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
