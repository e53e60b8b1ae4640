//! Prompt templates for LLM-powered analysis.

/// System prompt for summarizing one chat transcript into structured JSON.
///
/// The transcript itself is sent as the user message.
pub const SESSION_ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a precise conversation analyst.
Review the following chat transcript and respond ONLY with valid minified JSON.
Return an object with this exact shape:
{"summary": "concise 1-2 sentence overview",
 "mood": "positive|neutral|negative|mixed",
 "relationshipType": "personal|professional",
 "topics":["up to five brief sentences describing the most important recurring themes across the entire conversation"]}
Ensure the relationshipType is either "personal" or "professional".
Provide between 3 and 5 sentences, each summarizing a distinct theme that appears multiple times or carries notable weight across full conversation transcript. Avoid focusing on single one-off messages.
Do not include any additional text outside of the JSON object."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_field() {
        for field in ["summary", "mood", "relationshipType", "topics"] {
            assert!(SESSION_ANALYSIS_SYSTEM_PROMPT.contains(field));
        }
    }

    #[test]
    fn test_prompt_lists_allowed_moods() {
        assert!(SESSION_ANALYSIS_SYSTEM_PROMPT.contains("positive|neutral|negative|mixed"));
    }
}
