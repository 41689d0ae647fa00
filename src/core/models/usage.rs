use serde::{Deserialize, Serialize};

/// One token-usage record from the usage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsageEntry {
    /// Versioned model name, used as the pricing key (e.g. "gpt-4-0613")
    pub snapshot_id: String,
    #[serde(rename = "n_context_tokens_total")]
    pub context_tokens: u64,
    #[serde(rename = "n_generated_tokens_total")]
    pub generated_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_requests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_timestamp: Option<i64>,
}

/// One audio-transcription record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioUsageEntry {
    pub num_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_requests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Parsed body of a single-day usage query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUsagePayload {
    #[serde(rename = "data")]
    pub token_entries: Vec<TokenUsageEntry>,
    #[serde(rename = "whisper_api_data", default)]
    pub audio_entries: Vec<AudioUsageEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_payload() {
        let json = r#"{
            "object": "list",
            "data": [
                {
                    "aggregation_timestamp": 1688169600,
                    "n_requests": 3,
                    "operation": "completion",
                    "snapshot_id": "gpt-4-0613",
                    "n_context": 3,
                    "n_context_tokens_total": 1200,
                    "n_generated": 3,
                    "n_generated_tokens_total": 340
                }
            ],
            "ft_data": [],
            "dalle_api_data": [],
            "whisper_api_data": [
                {
                    "timestamp": 1688169600,
                    "model_id": "whisper-1",
                    "num_seconds": 61,
                    "num_requests": 2
                }
            ],
            "current_usage_usd": 0.0
        }"#;
        let payload: RawUsagePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.token_entries.len(), 1);
        assert_eq!(payload.token_entries[0].snapshot_id, "gpt-4-0613");
        assert_eq!(payload.token_entries[0].context_tokens, 1200);
        assert_eq!(payload.token_entries[0].generated_tokens, 340);
        assert_eq!(payload.audio_entries.len(), 1);
        assert_eq!(payload.audio_entries[0].num_seconds, 61);
    }

    #[test]
    fn whisper_data_is_optional() {
        let json = r#"{ "data": [] }"#;
        let payload: RawUsagePayload = serde_json::from_str(json).unwrap();
        assert!(payload.token_entries.is_empty());
        assert!(payload.audio_entries.is_empty());
    }

    #[test]
    fn token_data_is_required() {
        let json = r#"{ "whisper_api_data": [] }"#;
        assert!(serde_json::from_str::<RawUsagePayload>(json).is_err());
    }
}
