mod api;
pub mod prompts;
mod provider;
mod summarizer;

pub use api::LlmApiClient;
pub use provider::{LlmBackend, LlmProvider};
pub use summarizer::{normalize_summary, parse_summary_reply, Summarizer, NO_SUMMARY};
