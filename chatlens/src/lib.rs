//! Chatlens: splits chat transcripts into conversational sessions,
//! summarizes each session with an LLM and groups the summaries into themes.

pub mod analysis;
pub mod api;
pub mod clustering;
pub mod concurrency;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod models;
pub mod segmentation;
pub mod transcript;
pub mod vector;
