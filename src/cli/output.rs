use crate::core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Explicit flags first, then the configured default.
    pub fn resolve(json_flag: bool, format_flag: Option<&str>, settings: &Settings) -> Self {
        if json_flag {
            return Self::Json;
        }
        match format_flag.unwrap_or(settings.default_format.as_str()) {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    /// A live progress bar only makes sense for text output on an interactive stderr.
    pub fn show_progress(&self) -> bool {
        matches!(self.format, OutputFormat::Text) && is_tty(2)
    }

    pub fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

pub fn detect_color(color_flag: bool, settings: &Settings) -> bool {
    if !color_flag {
        return false;
    }
    match settings.color.as_str() {
        "never" => return false,
        "always" => return true,
        _ => {}
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    is_tty(1)
}

fn is_tty(fd: i32) -> bool {
    unsafe { libc_isatty(fd) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
