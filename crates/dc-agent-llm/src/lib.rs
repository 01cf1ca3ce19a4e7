pub mod provider;
pub mod providers;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use provider::{LLMError, LLMProvider, LLMStream, Result};
pub use providers::OpenAIProvider;
pub use types::LLMChunk;
