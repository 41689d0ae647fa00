//! OpenAI usage and billing endpoints.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::error::UsageError;
use crate::core::models::usage::RawUsagePayload;
use crate::core::month::YearMonth;
use crate::core::providers::fetch::UsageSource;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const USAGE_PATH: &str = "/v1/usage";
const BILLING_PATH: &str = "/dashboard/billing/usage";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated client for the per-day usage endpoint.
#[derive(Debug, Clone)]
pub struct UsageClient {
    client: Client,
    base_url: String,
    api_key: String,
    organization: Option<String>,
}

impl UsageClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, UsageError> {
        let client = Client::builder()
            .user_agent(concat!("ucost/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            organization: None,
        })
    }

    /// Scope requests to an organization via the `openai-organization` header.
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization.filter(|o| !o.is_empty());
        self
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, UsageError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?query, "Requesting usage endpoint");

        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json");
        if let Some(org) = &self.organization {
            request = request.header("openai-organization", org);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UsageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }

    /// Fetch raw usage for a single calendar day.
    #[instrument(skip(self))]
    pub async fn fetch_daily_usage(&self, date: NaiveDate) -> Result<RawUsagePayload, UsageError> {
        let body = self
            .get_text(USAGE_PATH, &[("date", date.format("%Y-%m-%d").to_string())])
            .await?;
        serde_json::from_str(&body).map_err(UsageError::ResponseParse)
    }

    /// Fetch the billing breakdown for a whole month as raw JSON.
    #[instrument(skip(self))]
    pub async fn fetch_billing_usage(
        &self,
        month: YearMonth,
    ) -> Result<serde_json::Value, UsageError> {
        let query = [
            ("start_date", month.first_day().format("%Y-%m-%d").to_string()),
            ("end_date", month.next_month_start().format("%Y-%m-%d").to_string()),
        ];
        let body = self.get_text(BILLING_PATH, &query).await?;
        serde_json::from_str(&body).map_err(UsageError::ResponseParse)
    }
}

#[async_trait]
impl UsageSource for UsageClient {
    async fn fetch_daily_usage(&self, date: NaiveDate) -> Result<RawUsagePayload, UsageError> {
        UsageClient::fetch_daily_usage(self, date).await
    }
}
