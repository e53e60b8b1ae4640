use crate::models::Message;

pub const OVERSIZED_SUMMARY: &str = "Segment too large, skipped.";
pub const TRIVIAL_SUMMARY: &str = "Empty or trivial conversation.";

/// What to do with one session before any external call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Longer than the configured maximum; answered with a placeholder.
    Oversized { chars: usize },
    /// Empty or shorter than the configured minimum; answered with a placeholder.
    Trivial { chars: usize },
    /// Sent to the summarizer.
    Submit(String),
}

impl Prepared {
    pub fn placeholder_summary(&self) -> Option<&'static str> {
        match self {
            Self::Oversized { .. } => Some(OVERSIZED_SUMMARY),
            Self::Trivial { .. } => Some(TRIVIAL_SUMMARY),
            Self::Submit(_) => None,
        }
    }
}

/// Flatten a session into `"sender: text"` lines.
///
/// Messages with blank text are left out, runs of whitespace inside a message
/// collapse to one space, and a missing sender is written as `Unknown`.
pub fn build_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| {
            let sender = if m.sender.is_empty() {
                "Unknown"
            } else {
                m.sender.as_str()
            };
            let text = m.text.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{sender}: {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply the size rules in priority order: oversized first, then trivial.
/// Lengths are counted in characters.
pub fn classify(transcript: String, max_chars: usize, min_chars: usize) -> Prepared {
    let chars = transcript.chars().count();
    if chars > max_chars {
        Prepared::Oversized { chars }
    } else if chars == 0 || chars < min_chars {
        Prepared::Trivial { chars }
    } else {
        Prepared::Submit(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, text: &str) -> Message {
        Message::new(sender, "1/2/24", "10:00 AM", text)
    }

    #[test]
    fn transcript_collapses_whitespace_and_skips_blank_messages() {
        let messages = vec![
            msg("Ana", "  hey\n\n there\tfriend "),
            msg("Ben", "   "),
            msg("", "who is this"),
        ];
        assert_eq!(
            build_transcript(&messages),
            "Ana: hey there friend\nUnknown: who is this"
        );
    }

    #[test]
    fn transcript_of_blank_session_is_empty() {
        assert_eq!(build_transcript(&[msg("Ana", "")]), "");
    }

    #[test]
    fn oversized_wins_over_trivial() {
        let prepared = classify("x".repeat(11), 10, 20);
        assert_eq!(prepared, Prepared::Oversized { chars: 11 });
        assert_eq!(prepared.placeholder_summary(), Some(OVERSIZED_SUMMARY));
    }

    #[test]
    fn size_boundaries() {
        assert_eq!(
            classify("a".repeat(50_000), 50_000, 20),
            Prepared::Submit("a".repeat(50_000))
        );
        assert_eq!(
            classify("a".repeat(50_001), 50_000, 20),
            Prepared::Oversized { chars: 50_001 }
        );
        assert_eq!(classify("a".repeat(19), 50_000, 20), Prepared::Trivial { chars: 19 });
        assert!(matches!(classify("a".repeat(20), 50_000, 20), Prepared::Submit(_)));
        assert_eq!(classify(String::new(), 50_000, 0), Prepared::Trivial { chars: 0 });
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 15 characters, 45 bytes.
        let text = "日本語".repeat(5);
        assert!(matches!(classify(text.clone(), 15, 15), Prepared::Submit(_)));
        assert_eq!(classify(text, 14, 0), Prepared::Oversized { chars: 15 });
    }
}
