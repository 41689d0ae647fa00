use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Problems with configuration or the pricing source. Fatal before any date is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Pricing file not found: {}", .0.display())]
    MissingPricing(PathBuf),
    #[error("Failed to parse pricing: {0}")]
    ParsePricing(#[from] serde_json::Error),
    #[error("Failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("Invalid rate for '{model}': {reason}")]
    InvalidRate { model: String, reason: String },
    #[error("Invalid month '{0}' (expected YYYY-MM)")]
    InvalidMonth(String),
    #[error("Invalid wait '{0}' (expected a non-negative number of seconds)")]
    InvalidWait(f64),
}

/// Failures while fetching or pricing a single day of usage.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("No pricing for model '{0}'")]
    UnknownModel(String),
    #[error("Request to usage endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from usage endpoint: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed usage response: {0}")]
    ResponseParse(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    UnknownModel,
    Request,
    ResponseParse,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config error"),
            Self::UnknownModel => write!(f, "unknown model"),
            Self::Request => write!(f, "request error"),
            Self::ResponseParse => write!(f, "response parse error"),
        }
    }
}

impl UsageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::UnknownModel(_) => ErrorKind::UnknownModel,
            Self::Request(_) | Self::Status { .. } => ErrorKind::Request,
            Self::ResponseParse(_) => ErrorKind::ResponseParse,
        }
    }
}

/// Why a monthly run stopped without producing a result.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("{} on {date}: {source}", .source.kind())]
    Day {
        date: NaiveDate,
        #[source]
        source: UsageError,
    },
    #[error("Cancelled before {date}")]
    Cancelled { date: NaiveDate },
}

impl AggregateError {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Day { date, .. } | Self::Cancelled { date } => *date,
        }
    }
}
