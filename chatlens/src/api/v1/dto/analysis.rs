use serde::{Deserialize, Serialize};

use crate::error::{ChatlensError, Result};
use crate::models::{AnalysisResult, Message};
use crate::segmentation::gap_from_minutes;
use crate::transcript::parse_export;

/// One line of a free-form conversation.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ConversationLine {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Request body for `POST /api/v1/analyze`.
///
/// The first present field wins, in the order `conversationText`,
/// `conversation`, `messages`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeConversationRequest {
    #[serde(default)]
    pub conversation_text: Option<String>,
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ConversationLine>>,
}

impl AnalyzeConversationRequest {
    pub fn into_text(self) -> String {
        if let Some(text) = self.conversation_text {
            return text;
        }
        if let Some(text) = self.conversation {
            return text;
        }
        self.messages
            .unwrap_or_default()
            .into_iter()
            .map(|line| {
                let sender = line
                    .sender
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string());
                format!("{sender}: {}", line.text.unwrap_or_default())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Request body for `POST /api/v1/sessions:analyze` and
/// `POST /api/v1/sessions:stream`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSessionsRequest {
    /// Chronologically ordered messages.
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    /// Raw chat export text, parsed when `messages` is absent.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Overrides the configured session gap.
    #[serde(default)]
    pub gap_minutes: Option<i64>,
}

impl AnalyzeSessionsRequest {
    /// Resolve the message list and the gap to segment with.
    pub fn resolve(self, default_gap_minutes: i64) -> Result<(Vec<Message>, i64)> {
        let gap_minutes = self.gap_minutes.unwrap_or(default_gap_minutes);
        if gap_from_minutes(gap_minutes).is_err() {
            return Err(ChatlensError::Validation(format!(
                "gapMinutes must be a positive number of minutes within range, got {gap_minutes}"
            )));
        }

        let messages = match (self.messages, self.transcript) {
            (Some(messages), _) => messages,
            (None, Some(transcript)) => parse_export(&transcript).messages,
            (None, None) => {
                return Err(ChatlensError::Validation(
                    "Provide either `messages` or `transcript`".to_string(),
                ))
            }
        };

        Ok((messages, gap_minutes))
    }
}

/// Payload of each `progress` event on the session stream.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgressEvent {
    pub result: AnalysisResult,
    pub completed: usize,
    pub total: usize,
}
