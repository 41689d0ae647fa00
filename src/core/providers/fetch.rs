use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::error::UsageError;
use crate::core::models::usage::RawUsagePayload;

/// Something that can return one day of raw usage.
///
/// Implementations issue exactly one request per call; the endpoint only
/// answers single-day queries.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn fetch_daily_usage(&self, date: NaiveDate) -> Result<RawUsagePayload, UsageError>;
}

/// Validate that a configured base URL uses HTTPS.
///
/// Must be called before a configured endpoint receives the API key, to keep
/// credentials off plain HTTP or other schemes.
pub fn validate_endpoint(url: &str) -> anyhow::Result<()> {
    if !url.starts_with("https://") {
        anyhow::bail!("usage endpoint must use HTTPS, got: {}", url);
    }
    Ok(())
}
