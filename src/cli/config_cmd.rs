use anyhow::Result;

use crate::cli::output::OutputOptions;
use crate::core::config::{AppConfig, API_KEY_ENV};

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            println!("  Set {} or usage.api_key before fetching usage.", API_KEY_ENV);
        }
        Err(e) => {
            eprintln!("Failed to generate config: {:#}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn path(_opts: &OutputOptions) -> Result<()> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `ucost config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        println!("  Pricing file: {}", config.usage.pricing_file.display());
        println!("  Wait between requests: {}s", config.usage.wait_seconds);
        println!(
            "  On per-day failure: {}",
            if config.usage.continue_on_error {
                "record and continue"
            } else {
                "abort"
            }
        );
        if config.usage.resolve_api_key().is_none() {
            println!("  No API key configured ({} is unset).", API_KEY_ENV);
        }
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}
