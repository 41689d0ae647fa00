pub mod fetch;
pub mod openai;
