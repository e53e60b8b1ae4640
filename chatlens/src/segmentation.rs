//! Gap-based splitting of a chat transcript into conversational sessions.

use chrono::Duration;

use crate::error::{ChatlensError, Result};
use crate::models::Message;

/// Four hours of silence closes a session unless configured otherwise.
pub const DEFAULT_GAP_MINUTES: i64 = 240;

/// A contiguous, non-empty run of messages with no internal gap above the
/// segmentation threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    fn open(first: Message) -> Self {
        Self {
            messages: vec![first],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Exported date and time of the first message.
    pub fn start(&self) -> String {
        self.messages.first().map(Message::stamp).unwrap_or_default()
    }

    /// Exported date and time of the last message.
    pub fn end(&self) -> String {
        self.messages.last().map(Message::stamp).unwrap_or_default()
    }
}

/// Split `messages` into sessions wherever the time since the previous
/// message is strictly greater than `gap`.
///
/// The input must already be in chronological order; it is never re-sorted.
/// Every timestamp is parsed, and the first one that cannot be parsed fails
/// the whole call.
pub fn segment(messages: &[Message], gap: Duration) -> Result<Vec<Session>> {
    let mut iter = messages.iter();
    let Some(first) = iter.next() else {
        return Ok(Vec::new());
    };

    let mut previous = first.timestamp()?;
    let mut current = Session::open(first.clone());
    let mut sessions = Vec::new();

    for message in iter {
        let at = message.timestamp()?;
        if at - previous > gap {
            sessions.push(std::mem::replace(
                &mut current,
                Session::open(message.clone()),
            ));
        } else {
            current.messages.push(message.clone());
        }
        previous = at;
    }

    sessions.push(current);
    Ok(sessions)
}

/// Gap threshold for a minute count. Zero, negative and values too large for
/// a `Duration` are rejected rather than clamped.
pub fn gap_from_minutes(gap_minutes: i64) -> Result<Duration> {
    if gap_minutes <= 0 {
        return Err(ChatlensError::Validation(format!(
            "Session gap must be a positive number of minutes, got {gap_minutes}"
        )));
    }
    Duration::try_minutes(gap_minutes).ok_or_else(|| {
        ChatlensError::Validation(format!("Session gap of {gap_minutes} minutes is out of range"))
    })
}

pub fn segment_by_minutes(messages: &[Message], gap_minutes: i64) -> Result<Vec<Session>> {
    segment(messages, gap_from_minutes(gap_minutes)?)
}
