/// Returns "$1.23", or four decimals for sub-dollar amounts ("$0.0720").
pub fn format_cost(cost: f64) -> String {
    if cost.abs() < 1.0 {
        format!("${:.4}", cost)
    } else {
        format!("${:.2}", cost)
    }
}

/// Returns "45s", "2m 05s" or "1h 03m".
pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Returns "[████████░░░░]" where █ = completed portion, ░ = remaining.
/// Width is the number of block characters inside the brackets.
pub fn format_progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let done_blocks = (fraction * width as f64).round() as usize;
    let remaining_blocks = width.saturating_sub(done_blocks);

    let filled: String = "█".repeat(done_blocks);
    let empty: String = "░".repeat(remaining_blocks);

    format!("[{}{}]", filled, empty)
}

/// Returns a bar scaled against `max`, used for the per-day cost chart.
pub fn format_cost_bar(cost: f64, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let blocks = ((cost / max).clamp(0.0, 1.0) * width as f64).round() as usize;
    "▇".repeat(blocks)
}

/// Returns "72%".
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction.clamp(0.0, 1.0) * 100.0).round() as u64)
}
