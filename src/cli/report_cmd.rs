use anyhow::Result;
use std::path::Path;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::export;

/// Title for a report: the `YYYY-MM` of its first day, else the file stem.
fn report_title(path: &Path, first_date: Option<&str>) -> String {
    first_date
        .and_then(|d| d.get(..7))
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Monthly".to_string())
}

/// Render a previously exported monthly file.
pub fn run(path: &Path, opts: &OutputOptions) -> Result<()> {
    let usage = export::read(path)?;

    match opts.format {
        OutputFormat::Text => {
            let first = usage.iter().next().map(|(d, _)| d);
            let title = report_title(path, first);
            println!("{}", renderer::render_monthly(&title, &usage, opts.use_color));
        }
        OutputFormat::Json => println!("{}", opts.to_json(&usage)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_first_date() {
        let path = Path::new("2023_07_openai_api_usage.json");
        assert_eq!(report_title(path, Some("2023-07-01")), "2023-07");
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let path = Path::new("/tmp/empty.json");
        assert_eq!(report_title(path, None), "empty");
    }
}
