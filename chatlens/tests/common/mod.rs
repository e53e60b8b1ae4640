// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;

use chatlens::embeddings::Embedder;
use chatlens::error::{ChatlensError, Result};
use chatlens::llm::Summarizer;
use chatlens::models::{Message, Mood, RelationshipType, SessionSummary};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use tempfile;
pub use wiremock;

type DelayFn = Box<dyn Fn(&str) -> Duration + Send + Sync>;

/// Summarizer double that sleeps, records concurrency and echoes the first
/// transcript line. Transcripts whose first line contains `boom` fail.
pub struct RecordingSummarizer {
    delay: DelayFn,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingSummarizer {
    pub fn instant() -> Self {
        Self::with_delay(|_| Duration::ZERO)
    }

    pub fn with_delay(delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        Self {
            delay: Box::new(delay),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<SessionSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(transcript);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let first = transcript.lines().next().unwrap_or_default();
        if first.contains("boom") {
            return Err(ChatlensError::Llm("summarizer exploded".to_string()));
        }

        Ok(SessionSummary {
            summary: first.to_string(),
            mood: if first.contains("sad") {
                Mood::Negative
            } else {
                Mood::Positive
            },
            topics: vec!["test".to_string()],
            relationship_type: if first.contains("work") {
                RelationshipType::Professional
            } else {
                RelationshipType::Personal
            },
        })
    }
}

/// Embeds texts on three fixed axes chosen by keyword.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        if text.contains("fail") {
            return Err(ChatlensError::Embedding("embedding backend down".to_string()));
        }
        Ok(if text.contains("work") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("trip") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        })
    }
}

/// One message per day at 9 AM in January 2024, starting on the 1st.
pub fn daily_messages(texts: &[&str]) -> Vec<Message> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Message::new("Ana", format!("1/{}/24", i + 1), "9:00 AM", *text))
        .collect()
}
