mod cli;
mod core;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::core::config::{wait_duration, AppConfig};
use crate::core::month::YearMonth;

#[derive(Parser)]
#[command(name = "ucost", about = "Monthly API usage cost tracking CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format (text|json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a month of daily usage and compute its cost
    #[command(visible_alias = "monthly")]
    Usage {
        /// Month to process as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<YearMonth>,

        /// Seconds to wait after each day's request
        #[arg(short, long, value_parser = parse_wait)]
        wait: Option<f64>,

        /// Walk the month without any network requests
        #[arg(long)]
        dry_run: bool,

        /// Record failed days and keep going instead of aborting
        #[arg(long)]
        continue_on_error: bool,

        /// Pricing file (default: usage.pricing_file)
        #[arg(long)]
        pricing: Option<PathBuf>,

        /// Directory for the exported JSON
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip writing the export file
        #[arg(long)]
        no_export: bool,
    },
    /// Display a previously exported month
    Report {
        /// Exported usage file
        file: PathBuf,
    },
    /// Fetch and summarize the billing usage report
    Billing {
        /// Month to query as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<YearMonth>,

        /// Organization id (default: usage.organization)
        #[arg(long)]
        organization: Option<String>,

        /// Summarize a saved billing response instead of fetching
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for the saved raw response
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List the loaded pricing table
    Pricing {
        /// Pricing file (default: usage.pricing_file)
        #[arg(long)]
        pricing: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the config file location
    Path,
}

fn parse_wait(s: &str) -> Result<f64, String> {
    let seconds: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    wait_duration(seconds).map_err(|e| e.to_string())?;
    Ok(seconds)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,ucost=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Config commands must work even when the file on disk is broken.
    let config = match cli.command {
        Some(Commands::Config { .. }) => AppConfig::default(),
        _ => AppConfig::load()?,
    };

    let output_opts = cli::output::OutputOptions {
        format: cli::output::OutputFormat::resolve(
            cli.json,
            cli.format.as_deref(),
            &config.settings,
        ),
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings),
        verbose: cli.verbose,
    };

    match cli.command {
        None => {
            cli::usage_cmd::run(Default::default(), &config, &output_opts).await?;
        }
        Some(Commands::Usage {
            month,
            wait,
            dry_run,
            continue_on_error,
            pricing,
            output_dir,
            no_export,
        }) => {
            let args = cli::usage_cmd::UsageArgs {
                month,
                wait,
                dry_run,
                continue_on_error,
                pricing,
                output_dir,
                no_export,
            };
            cli::usage_cmd::run(args, &config, &output_opts).await?;
        }
        Some(Commands::Report { file }) => cli::report_cmd::run(&file, &output_opts)?,
        Some(Commands::Billing {
            month,
            organization,
            input,
            output_dir,
        }) => {
            let args = cli::billing_cmd::BillingArgs {
                month,
                organization,
                input,
                output_dir,
            };
            cli::billing_cmd::run(args, &config, &output_opts).await?;
        }
        Some(Commands::Pricing { pricing }) => {
            cli::pricing_cmd::run(pricing, &config, &output_opts)?
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
            ConfigAction::Path => cli::config_cmd::path(&output_opts)?,
        },
    }

    Ok(())
}
