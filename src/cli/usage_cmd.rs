use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::progress::TerminalProgress;
use crate::cli::renderer;
use crate::core::aggregator::{
    AggregatorOptions, ErrorPolicy, MonthlyUsageAggregator, NoProgress, TokioPacer,
};
use crate::core::config::{wait_duration, AppConfig, API_KEY_ENV};
use crate::core::cost::calculator::CostCalculator;
use crate::core::cost::pricing::PricingTable;
use crate::core::error::ConfigError;
use crate::core::export;
use crate::core::month::YearMonth;
use crate::core::providers::fetch::validate_endpoint;
use crate::core::providers::openai::UsageClient;

/// Command-line overrides for a monthly run.
#[derive(Debug, Clone, Default)]
pub struct UsageArgs {
    pub month: Option<YearMonth>,
    pub wait: Option<f64>,
    pub dry_run: bool,
    pub continue_on_error: bool,
    pub pricing: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub no_export: bool,
}

impl UsageArgs {
    fn aggregator_options(&self, config: &AppConfig) -> Result<AggregatorOptions, ConfigError> {
        let mut options = AggregatorOptions::new(self.month.unwrap_or_else(YearMonth::current));
        options.delay = match self.wait {
            Some(secs) => wait_duration(secs)?,
            None => config.usage.wait()?,
        };
        options.dry_run = self.dry_run;
        options.on_error = if self.continue_on_error {
            ErrorPolicy::Continue
        } else {
            config.usage.error_policy()
        };
        Ok(options)
    }
}

/// Spawn a Ctrl-C watcher that cancels the run.
fn cancel_on_ctrl_c() -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current day");
            token.cancel();
        }
    });
    (cancel, handle)
}

pub async fn run(args: UsageArgs, config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let options = args.aggregator_options(config)?;
    let month = options.month;

    // Pricing problems are fatal before any date is processed.
    let pricing_path = args
        .pricing
        .clone()
        .unwrap_or_else(|| config.usage.pricing_file.clone());
    let pricing = PricingTable::load(&pricing_path)?;

    let api_key = config.usage.resolve_api_key();
    if !options.dry_run {
        validate_endpoint(&config.usage.base_url)?;
        if api_key.is_none() {
            anyhow::bail!("{} env var not set (or set usage.api_key in the config)", API_KEY_ENV);
        }
    }
    let client = UsageClient::new(api_key.unwrap_or_default(), config.usage.base_url.as_str())
        .context("Failed to build HTTP client")?
        .with_organization(config.usage.organization.clone());

    let (cancel, watcher) = cancel_on_ctrl_c();
    let pacer = TokioPacer::new(cancel.clone());
    let calculator = CostCalculator::new(&pricing, config.usage.audio_model.as_str());
    let mut aggregator = MonthlyUsageAggregator::new(&client, calculator, &pacer, options)
        .with_cancellation(cancel);
    debug!(options = ?aggregator.options(), "Aggregator configured");

    let result = if opts.show_progress() {
        let mut progress = TerminalProgress::new(month.to_string());
        let result = aggregator.run(&mut progress).await;
        progress.finish();
        result
    } else {
        aggregator.run(&mut NoProgress).await
    };
    watcher.abort();

    let usage = match result {
        Ok(usage) => usage,
        Err(e) => {
            let date = e.date();
            warn!(%date, state = ?aggregator.state(), "Monthly run stopped");
            return Err(anyhow::Error::new(e)
                .context(format!("Monthly run for {} stopped at {}", month, date)));
        }
    };
    debug!(state = ?aggregator.state(), days = usage.len(), "Monthly run finished");

    let export_path = if args.no_export {
        None
    } else {
        let dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.usage.output_dir.clone());
        Some(export::write(&dir, month, &usage)?)
    };

    match opts.format {
        OutputFormat::Text => {
            println!(
                "{}",
                renderer::render_monthly(&month.to_string(), &usage, opts.use_color)
            );
            if let Some(path) = export_path {
                println!("\nSaved {}", path.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", opts.to_json(&usage)?);
            if let Some(path) = export_path {
                if opts.verbose {
                    eprintln!("Saved {}", path.display());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        config.usage.wait_seconds = 30.0;
        let args = UsageArgs {
            month: Some("2023-02".parse().unwrap()),
            wait: Some(0.5),
            dry_run: true,
            continue_on_error: true,
            ..Default::default()
        };
        let options = args.aggregator_options(&config).unwrap();
        assert_eq!(options.month.to_string(), "2023-02");
        assert_eq!(options.delay, Duration::from_millis(500));
        assert!(options.dry_run);
        assert_eq!(options.on_error, ErrorPolicy::Continue);
    }

    #[test]
    fn config_supplies_defaults() {
        let mut config = AppConfig::default();
        config.usage.continue_on_error = true;
        let options = UsageArgs::default().aggregator_options(&config).unwrap();
        assert_eq!(options.delay, Duration::from_secs(12));
        assert!(!options.dry_run);
        assert_eq!(options.on_error, ErrorPolicy::Continue);
    }

    #[test]
    fn unrepresentable_wait_is_rejected() {
        let config = AppConfig::default();
        let args = UsageArgs {
            wait: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(matches!(
            args.aggregator_options(&config),
            Err(ConfigError::InvalidWait(_))
        ));

        let mut config = AppConfig::default();
        config.usage.wait_seconds = 1e20;
        assert!(UsageArgs::default().aggregator_options(&config).is_err());
    }

    #[tokio::test]
    async fn dry_run_exports_placeholder_month() {
        let dir = tempfile::tempdir().unwrap();
        let pricing = dir.path().join("pricing.json");
        std::fs::write(
            &pricing,
            r#"{ "whisper-1": { "context": 0.006, "per_minutes": 1 } }"#,
        )
        .unwrap();

        let args = UsageArgs {
            month: Some("2023-02".parse().unwrap()),
            wait: Some(0.0),
            dry_run: true,
            pricing: Some(pricing),
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
            verbose: false,
        };
        run(args, &AppConfig::default(), &opts).await.unwrap();

        let usage = export::read(&dir.path().join("2023_02_openai_api_usage.json")).unwrap();
        assert_eq!(usage.len(), 28);
        assert_eq!(usage.total_costs(), 0.0);
    }

    #[tokio::test]
    async fn missing_pricing_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let args = UsageArgs {
            month: Some("2023-02".parse().unwrap()),
            dry_run: true,
            pricing: Some(dir.path().join("absent.json")),
            no_export: true,
            ..Default::default()
        };
        let opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
            verbose: false,
        };
        let err = run(args, &AppConfig::default(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("Pricing file not found"));
    }
}
