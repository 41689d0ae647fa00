use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::billing::{self, BillingSummary};
use crate::core::config::{AppConfig, API_KEY_ENV};
use crate::core::month::YearMonth;
use crate::core::providers::fetch::validate_endpoint;
use crate::core::providers::openai::UsageClient;

#[derive(Debug, Clone, Default)]
pub struct BillingArgs {
    pub month: Option<YearMonth>,
    pub organization: Option<String>,
    /// Summarize a previously saved response instead of fetching
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

pub async fn run(args: BillingArgs, config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let (title, raw) = match &args.input {
        Some(path) => {
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Saved".to_string());
            (title, billing::load_raw(path)?)
        }
        None => {
            let month = args.month.unwrap_or_else(YearMonth::current);
            let organization = args
                .organization
                .clone()
                .or_else(|| config.usage.organization.clone())
                .filter(|o| !o.is_empty())
                .context("An organization is required (--organization or usage.organization)")?;
            validate_endpoint(&config.usage.base_url)?;
            let api_key = config
                .usage
                .resolve_api_key()
                .with_context(|| format!("{} env var not set", API_KEY_ENV))?;

            let client = UsageClient::new(api_key, config.usage.base_url.as_str())?
                .with_organization(Some(organization.clone()));
            let raw = client.fetch_billing_usage(month).await?;

            let dir = args
                .output_dir
                .clone()
                .unwrap_or_else(|| config.usage.output_dir.clone());
            let path = billing::save_raw(&dir, month, &organization, &raw)?;
            tracing::info!(path = %path.display(), "Saved billing response");
            (month.to_string(), raw)
        }
    };

    let summary = BillingSummary::from_value(&raw)?;
    if let Some(diff) = summary.total_mismatch() {
        tracing::warn!(
            summed = summary.total_cost,
            reported = ?summary.reported_total,
            diff,
            "Billing line items do not add up to the reported total"
        );
    }
    if summary.skipped_days > 0 {
        tracing::warn!(days = summary.skipped_days, "Skipped billing days with invalid timestamps");
    }
    match opts.format {
        OutputFormat::Text => {
            println!("{}", renderer::render_billing(&title, &summary, opts.use_color))
        }
        OutputFormat::Json => println!("{}", opts.to_json(&summary)?),
    }
    Ok(())
}
