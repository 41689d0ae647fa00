use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::cost::pricing::{PricingTable, RateSpec};

/// Load, validate and list the pricing table.
pub fn run(pricing: Option<PathBuf>, config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let path = pricing.unwrap_or_else(|| config.usage.pricing_file.clone());
    let table = PricingTable::load(&path)?;
    if table.is_empty() {
        tracing::warn!(path = %path.display(), "Pricing file defines no models");
    }

    match opts.format {
        OutputFormat::Text => {
            println!("{}", renderer::render_pricing(&table, opts.use_color));
            let audio_model = config.usage.audio_model.as_str();
            if table.lookup(audio_model).is_err() {
                eprintln!(
                    "Note: no rate for audio model '{}'; days with audio usage will fail",
                    audio_model
                );
            }
        }
        OutputFormat::Json => {
            let rates: BTreeMap<&str, &RateSpec> = table.models().collect();
            println!("{}", opts.to_json(&rates)?);
        }
    }
    Ok(())
}
