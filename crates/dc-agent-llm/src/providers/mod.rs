pub mod common;
pub mod openai;

pub use openai::OpenAIProvider;
