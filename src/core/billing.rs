use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::export;
use crate::core::month::YearMonth;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingLineItem {
    pub name: String,
    /// Cost in cents
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingDay {
    /// Unix timestamp (seconds) for the start of the day
    pub timestamp: f64,
    #[serde(default)]
    pub line_items: Vec<BillingLineItem>,
}

/// Response from the dashboard billing usage endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingUsageResponse {
    #[serde(default)]
    pub daily_costs: Vec<BillingDay>,
    /// Total in cents, when reported
    pub total_usage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingRow {
    pub date: NaiveDate,
    pub name: String,
    pub cost: f64,
}

/// Per-line-item dollar totals plus the daily series they came from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BillingSummary {
    pub totals: BTreeMap<String, f64>,
    pub series: Vec<BillingRow>,
    pub total_cost: f64,
    /// The endpoint's own total in dollars, when it sends one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_total: Option<f64>,
    /// Days whose timestamp could not be turned into a date
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped_days: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Largest gap between the summed and reported totals still treated as rounding.
const TOTAL_TOLERANCE: f64 = 0.01;

impl BillingSummary {
    pub fn from_response(response: &BillingUsageResponse) -> Self {
        let mut summary = Self {
            reported_total: response.total_usage.map(|cents| cents / 100.0),
            ..Self::default()
        };
        for day in &response.daily_costs {
            let date = day
                .timestamp
                .is_finite()
                .then(|| DateTime::from_timestamp(day.timestamp as i64, 0))
                .flatten()
                .map(|dt| dt.date_naive());
            let Some(date) = date else {
                tracing::warn!(timestamp = day.timestamp, "Skipping billing day with invalid timestamp");
                summary.skipped_days += 1;
                continue;
            };
            for item in &day.line_items {
                let cost = item.cost / 100.0;
                *summary.totals.entry(item.name.clone()).or_insert(0.0) += cost;
                summary.series.push(BillingRow {
                    date,
                    name: item.name.clone(),
                    cost,
                });
            }
        }
        summary.total_cost = summary.totals.values().sum();
        summary
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let response: BillingUsageResponse = serde_json::from_value(value.clone())
            .context("Failed to parse billing usage response")?;
        Ok(Self::from_response(&response))
    }

    /// Difference between the summed and reported totals, when it exceeds rounding.
    pub fn total_mismatch(&self) -> Option<f64> {
        self.reported_total
            .map(|reported| self.total_cost - reported)
            .filter(|diff| diff.abs() > TOTAL_TOLERANCE)
    }

    /// Dollar total per day, in date order.
    pub fn daily_totals(&self) -> BTreeMap<NaiveDate, f64> {
        let mut days = BTreeMap::new();
        for row in &self.series {
            *days.entry(row.date).or_insert(0.0) += row.cost;
        }
        days
    }

    /// Line items ordered by descending cost.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut items: Vec<(&str, f64)> =
            self.totals.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        items.sort_by(|a, b| b.1.total_cmp(&a.1));
        items
    }
}

/// `{start}_to_{end}_{organization}_usage.json`, with the organization reduced to
/// `[A-Za-z0-9_-]` so the name never leaves the output directory.
pub fn raw_file_name(month: YearMonth, organization: &str) -> String {
    let organization: String = organization
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}_to_{}_{}_usage.json",
        month.first_day().format("%Y-%m-%d"),
        month.next_month_start().format("%Y-%m-%d"),
        organization
    )
}

/// Save the raw billing response next to other exports.
pub fn save_raw(
    dir: &Path,
    month: YearMonth,
    organization: &str,
    raw: &serde_json::Value,
) -> Result<PathBuf> {
    let path = dir.join(raw_file_name(month, organization));
    export::write_json(&path, raw)?;
    Ok(path)
}

pub fn load_raw(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse billing file {}", path.display()))
}
