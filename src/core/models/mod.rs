pub mod cost;
pub mod usage;
