//! Reader for WhatsApp "Export chat" text files.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ChatlensError, Result};
use crate::models::{parse_date, Message};

const GROUP_CHAT_NAME: &str = "Group Chat";

/// Messages of one exported chat plus metadata derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// Distinct senders in order of first appearance.
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// [3/6/22, 11:11:20 PM] Name: text
fn bracketed_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(\d{1,2}/\d{1,2}/\d{2,4}),\s+([\d:]+(?:[\x{202F}\x{00A0} ]?[APMapm]{2})?)\]\s([^:]+):\s(.*)$",
        )
        .expect("static regex")
    })
}

// 3/6/22, 11:11 PM - Name: text
fn dashed_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,2}/\d{1,2}/\d{2,4}),\s+([\d:]+(?:[\x{202F}\x{00A0} ]?[APMapm]{2})?)\s-\s([^:]+):\s(.*)$",
        )
        .expect("static regex")
    })
}

fn parse_line(line: &str) -> Option<Message> {
    [bracketed_line(), dashed_line()].iter().find_map(|re| {
        let caps = re.captures(line)?;
        Some(Message::new(
            caps[3].to_string(),
            caps[1].to_string(),
            caps[2].to_string(),
            caps[4].trim().to_string(),
        ))
    })
}

/// Parse the text of a chat export.
///
/// Lines that do not start a new message continue the previous one and are
/// appended after a newline. Lines before the first message and blank lines
/// are ignored. Never fails; unrecognised content simply yields no messages.
pub fn parse_export(text: &str) -> Transcript {
    let mut messages: Vec<Message> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim_start_matches(['\u{feff}', '\u{200e}']);
        if line.trim().is_empty() {
            continue;
        }

        if let Some(message) = parse_line(line) {
            messages.push(message);
        } else if let Some(last) = messages.last_mut() {
            last.text.push('\n');
            last.text.push_str(line.trim());
        }
    }

    if messages.is_empty() {
        return Transcript::default();
    }

    let mut participants: Vec<String> = Vec::new();
    for message in &messages {
        if !participants.contains(&message.sender) {
            participants.push(message.sender.clone());
        }
    }

    let chat_name = if participants.len() == 2 {
        participants[1].clone()
    } else {
        GROUP_CHAT_NAME.to_string()
    };

    let (first_date, last_date) = date_range(&messages);

    tracing::debug!(
        messages = messages.len(),
        participants = participants.len(),
        "Parsed chat export"
    );

    Transcript {
        participants,
        messages,
        chat_name: Some(chat_name),
        first_date,
        last_date,
    }
}

/// Earliest and latest calendar date as exported. Dates that cannot be parsed
/// are ignored; the first and last message are used if none can.
fn date_range(messages: &[Message]) -> (Option<String>, Option<String>) {
    let dated = messages
        .iter()
        .filter_map(|m| parse_date(&m.date).map(|d| (d, m.date.as_str())));

    let mut earliest: Option<(chrono::NaiveDate, &str)> = None;
    let mut latest: Option<(chrono::NaiveDate, &str)> = None;
    for (date, raw) in dated {
        if earliest.map_or(true, |(d, _)| date < d) {
            earliest = Some((date, raw));
        }
        if latest.map_or(true, |(d, _)| date > d) {
            latest = Some((date, raw));
        }
    }

    match (earliest, latest) {
        (Some((_, first)), Some((_, last))) => (Some(first.to_string()), Some(last.to_string())),
        _ => (
            messages.first().map(|m| m.date.clone()),
            messages.last().map(|m| m.date.clone()),
        ),
    }
}

/// Read and parse an export file from disk.
pub fn read_export(path: impl AsRef<Path>) -> Result<Transcript> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        ChatlensError::Transcript(format!("{} is not valid UTF-8: {e}", path.display()))
    })?;
    Ok(parse_export(&text))
}
