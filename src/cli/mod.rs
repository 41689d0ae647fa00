pub mod billing_cmd;
pub mod config_cmd;
pub mod output;
pub mod pricing_cmd;
pub mod progress;
pub mod renderer;
pub mod report_cmd;
pub mod usage_cmd;
