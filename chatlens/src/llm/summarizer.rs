//! The summarization capability and tolerant parsing of model replies.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::llm::prompts::SESSION_ANALYSIS_SYSTEM_PROMPT;
use crate::llm::provider::LlmProvider;
use crate::models::{Mood, RelationshipType, SessionSummary};

pub const NO_SUMMARY: &str = "No summary.";
const MAX_TOPICS: usize = 5;

/// Turns a flattened conversation transcript into a structured summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<SessionSummary>;
}

#[async_trait]
impl Summarizer for LlmProvider {
    async fn summarize(&self, transcript: &str) -> Result<SessionSummary> {
        let reply = self
            .complete(SESSION_ANALYSIS_SYSTEM_PROMPT, transcript)
            .await?;
        Ok(parse_summary_reply(&reply))
    }
}

/// Parse a model reply that is supposed to be a JSON object.
///
/// Tries the whole reply, then the outermost `{...}` fragment inside it, and
/// finally treats the raw reply as the summary with a mood keyword scanned
/// out of the text. Never fails.
pub fn parse_summary_reply(raw: &str) -> SessionSummary {
    let raw = raw.trim();
    if raw.is_empty() {
        return normalize_summary(&Value::Null);
    }

    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return normalize_summary(&value);
    }

    if let Some(fragment) = object_fragment_regex().find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(fragment.as_str()) {
            return normalize_summary(&value);
        }
    }

    let mood = mood_keyword_regex()
        .find(raw)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| Mood::Neutral.to_string());

    normalize_summary(&serde_json::json!({ "summary": raw, "mood": mood }))
}

/// Coerce an arbitrary JSON value into a well-formed summary.
pub fn normalize_summary(value: &Value) -> SessionSummary {
    let Some(object) = value.as_object() else {
        return SessionSummary {
            summary: NO_SUMMARY.to_string(),
            mood: Mood::default(),
            topics: Vec::new(),
            relationship_type: RelationshipType::default(),
        };
    };

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUMMARY)
        .to_string();

    let mood = object
        .get("mood")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Mood>().ok())
        .unwrap_or_default();

    // A present-but-unrecognised `relationshipType` does not fall through to
    // `relationship`.
    let relationship_type = object
        .get("relationshipType")
        .and_then(Value::as_str)
        .or_else(|| object.get("relationship").and_then(Value::as_str))
        .and_then(|s| s.parse::<RelationshipType>().ok())
        .unwrap_or_default();

    let topics = object
        .get("topics")
        .and_then(Value::as_array)
        .or_else(|| object.get("topTopics").and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .take(MAX_TOPICS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    SessionSummary {
        summary,
        mood,
        topics,
        relationship_type,
    }
}

fn object_fragment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

fn mood_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)positive|negative|mixed|neutral").expect("static regex"))
}
