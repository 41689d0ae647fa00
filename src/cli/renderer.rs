use colored::{control, Colorize};

use crate::core::billing::BillingSummary;
use crate::core::cost::pricing::PricingTable;
use crate::core::formatter::{format_cost, format_cost_bar, format_seconds};
use crate::core::models::cost::{DayRecord, MonthlyUsage};

const CHART_WIDTH: usize = 20;

/// Render a month of usage as a colored (or plain) block.
///
/// Layout:
/// ```text
///  2023-07 usage (31 days)
///   Total     $2.2320
///   Whisper   $0.3720 (1h 02m)
///   By Model:
///     gpt-4-0613               $1.8600  (context $0.9300 / generated $0.9300)
///   Daily:
///     2023-07-01  $0.0720  ▇▇▇▇▇▇▇▇▇▇
///     2023-07-02  request error: HTTP 500 from usage endpoint: boom
/// ```
pub fn render_monthly(title: &str, usage: &MonthlyUsage, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(
        format!(" {} usage ({} days)", title, usage.len())
            .bold()
            .to_string(),
    );

    lines.push(format!(
        "  {}     {}",
        "Total".cyan(),
        format_cost(usage.total_costs()).bold()
    ));

    let whisper = usage.whisper_totals();
    if whisper.total_seconds > 0 {
        lines.push(format!(
            "  {}   {} ({})",
            "Whisper".cyan(),
            format_cost(whisper.total_costs),
            format_seconds(whisper.total_seconds)
        ));
    }

    let models = usage.model_totals();
    if !models.is_empty() {
        lines.push(format!("  {}:", "By Model".cyan()));
        let mut ranked: Vec<_> = models.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cost.total_cmp(&a.1.total_cost));
        for (model, cost) in ranked {
            lines.push(format!(
                "    {:<24} {:<9}  (context {} / generated {})",
                model,
                format_cost(cost.total_cost),
                format_cost(cost.context_token_cost),
                format_cost(cost.generated_token_cost)
            ));
        }
    }

    if !usage.is_empty() {
        let max = usage
            .iter()
            .filter_map(|(_, r)| r.summary())
            .map(|s| s.total_costs)
            .fold(0.0_f64, f64::max);
        lines.push(format!("  {}:", "Daily".cyan()));
        for (date, record) in usage.iter() {
            match record {
                DayRecord::Summary(summary) => lines.push(format!(
                    "    {}  {:<9}  {}",
                    date,
                    format_cost(summary.total_costs),
                    format_cost_bar(summary.total_costs, max, CHART_WIDTH).magenta()
                )),
                DayRecord::Failed { error } => lines.push(format!(
                    "    {}  {}",
                    date,
                    format!("{}: {}", error.kind, error.message).red()
                )),
            }
        }
    }

    let failed = usage.failed_days().len();
    if failed > 0 {
        lines.push(format!(
            "  {}",
            format!(
                "{} day{} failed; totals exclude them",
                failed,
                if failed == 1 { "" } else { "s" }
            )
            .yellow()
        ));
    }

    lines.join("\n")
}

/// Render a billing summary: ranked line items, the grand total, then each day
/// with its line items.
pub fn render_billing(title: &str, summary: &BillingSummary, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(" {} billing", title).bold().to_string());
    for (name, cost) in summary.ranked() {
        lines.push(format!("    {:<28} {}", name, format_cost(cost)));
    }
    lines.push(format!(
        "  {}     {}",
        "Total".cyan(),
        format_cost(summary.total_cost).bold()
    ));
    if let Some(diff) = summary.total_mismatch() {
        lines.push(format!(
            "  {}",
            format!("Reported total differs by {}", format_cost(diff.abs())).yellow()
        ));
    }

    let daily = summary.daily_totals();
    if !daily.is_empty() {
        let max = daily.values().copied().fold(0.0_f64, f64::max);
        lines.push(format!("  {}:", "Daily".cyan()));
        for (date, total) in &daily {
            lines.push(format!(
                "    {}  {:<9}  {}",
                date,
                format_cost(*total),
                format_cost_bar(*total, max, CHART_WIDTH).magenta()
            ));
            for row in summary.series.iter().filter(|r| r.date == *date) {
                lines.push(format!("        {:<24} {}", row.name, format_cost(row.cost)));
            }
        }
    }
    lines.join("\n")
}

pub fn render_pricing(table: &PricingTable, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(" Pricing ({} models)", table.len()).bold().to_string());
    for (model, rate) in table.models() {
        let detail = match (rate.per_tokens, rate.per_minutes) {
            (Some(per), _) => format!(
                "${} context / ${} generated per {} tokens",
                rate.context_rate,
                rate.generated_rate.unwrap_or_default(),
                per
            ),
            (None, Some(per)) => format!("${} per {} min of audio", rate.context_rate, per),
            (None, None) => String::new(),
        };
        lines.push(format!("    {:<24} {}", model.cyan(), detail));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::models::cost::{
        DailyCostSummary, DailyModelCosts, DayError, ModelCostBreakdown, WhisperCostBreakdown,
    };
    use std::collections::BTreeMap;

    fn make_usage() -> MonthlyUsage {
        let mut models = BTreeMap::new();
        models.insert(
            "gpt-4-0613".to_string(),
            ModelCostBreakdown {
                context_token_cost: 0.03,
                generated_token_cost: 0.03,
                total_cost: 0.06,
            },
        );
        let summary = DailyCostSummary::new(
            DailyModelCosts {
                models,
                total_costs: 0.06,
            },
            WhisperCostBreakdown {
                total_seconds: 120,
                total_costs: 0.012,
            },
        );
        let mut usage = MonthlyUsage::default();
        usage.insert("2023-07-01".to_string(), DayRecord::Summary(summary));
        usage.insert(
            "2023-07-02".to_string(),
            DayRecord::Failed {
                error: DayError {
                    kind: ErrorKind::Request,
                    message: "timed out".to_string(),
                },
            },
        );
        usage
    }

    #[test]
    fn monthly_contains_totals_and_models() {
        let output = render_monthly("2023-07", &make_usage(), false);
        assert!(output.contains("2023-07 usage (2 days)"));
        assert!(output.contains("$0.0720"));
        assert!(output.contains("gpt-4-0613"));
        assert!(output.contains("2m 00s"));
    }

    #[test]
    fn monthly_shows_failed_days() {
        let output = render_monthly("2023-07", &make_usage(), false);
        assert!(output.contains("2023-07-02  request error: timed out"));
        assert!(output.contains("1 day failed"));
    }

    #[test]
    fn monthly_no_ansi_when_color_false() {
        let output = render_monthly("2023-07", &make_usage(), false);
        assert!(!output.contains('\x1b'), "output should not contain ANSI codes");
    }

    #[test]
    fn billing_lists_line_items() {
        let mut summary = BillingSummary::default();
        summary.totals.insert("GPT-4".to_string(), 1.5);
        summary.totals.insert("Audio models".to_string(), 0.06);
        summary.total_cost = 1.56;
        let output = render_billing("2023-07", &summary, false);
        assert!(output.contains("GPT-4"));
        assert!(output.contains("$1.56"));
        let gpt = output.find("GPT-4").unwrap();
        let audio = output.find("Audio models").unwrap();
        assert!(gpt < audio);
    }

    #[test]
    fn billing_lists_each_day() {
        let summary = BillingSummary::from_value(&serde_json::json!({
            "daily_costs": [
                { "timestamp": 1688169600, "line_items": [
                    { "name": "GPT-4", "cost": 120 },
                    { "name": "Audio models", "cost": 6 }
                ] },
                { "timestamp": 1688256000, "line_items": [ { "name": "GPT-4", "cost": 30 } ] }
            ]
        }))
        .unwrap();
        let output = render_billing("2023-07", &summary, false);
        assert!(output.contains("Daily:"));
        assert!(output.contains("2023-07-01  $1.26"));
        assert!(output.contains("2023-07-02  $0.3000"));
        let day_one = output.find("2023-07-01").unwrap();
        let day_two = output.find("2023-07-02").unwrap();
        let audio_row = output.rfind("Audio models").unwrap();
        assert!(day_one < audio_row && audio_row < day_two);
    }

    #[test]
    fn pricing_lists_both_kinds() {
        let table = PricingTable::from_json(
            r#"{
                "gpt-4-0613": { "context": 0.03, "generated": 0.06, "per_tokens": 1000 },
                "whisper-1": { "context": 0.006, "per_minutes": 1 }
            }"#,
        )
        .unwrap();
        let output = render_pricing(&table, false);
        assert!(output.contains("2 models"));
        assert!(output.contains("per 1000 tokens"));
        assert!(output.contains("per 1 min of audio"));
    }
}
