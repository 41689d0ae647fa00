use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::models::cost::MonthlyUsage;
use crate::core::month::YearMonth;

/// `{YYYY}_{MM}_openai_api_usage.json`
pub fn file_name(month: YearMonth) -> String {
    format!("{:04}_{:02}_openai_api_usage.json", month.year(), month.month())
}

/// Serialize with 4-space indentation.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).context("Failed to serialize JSON")?;
    String::from_utf8(buf).context("Serialized JSON was not UTF-8")
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let json = to_json_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write a finished month into `dir`, returning the file path.
pub fn write(dir: &Path, month: YearMonth, usage: &MonthlyUsage) -> Result<PathBuf> {
    let path = dir.join(file_name(month));
    write_json(&path, usage)?;
    tracing::info!(path = %path.display(), days = usage.len(), "Exported monthly usage");
    Ok(path)
}

/// Load a previously exported month.
pub fn read(path: &Path) -> Result<MonthlyUsage> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse monthly usage file {}", path.display()))
}
