use serde::{Deserialize, Serialize};

/// Overall emotional tone of a conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    #[default]
    Neutral,
    Negative,
    Mixed,
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            "mixed" => Ok(Self::Mixed),
            _ => Err(format!("Unknown mood: {s}")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    #[default]
    Personal,
    Professional,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Professional => write!(f, "professional"),
        }
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(Self::Personal),
            "professional" => Ok(Self::Professional),
            _ => Err(format!("Unknown relationship type: {s}")),
        }
    }
}

/// Structured reply of the summarization capability for one transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub summary: String,
    pub mood: Mood,
    /// At most five recurring themes, in the order the model listed them.
    pub topics: Vec<String>,
    pub relationship_type: RelationshipType,
}

/// Per-session outcome of an analysis run.
///
/// `id` is the 1-based position of the session in the segmented sequence and
/// is fixed before any summarizer call starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: usize,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Absent on locally synthesized placeholder results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
}

impl AnalysisResult {
    pub fn from_summary(id: usize, start: String, end: String, summary: SessionSummary) -> Self {
        Self {
            id,
            start,
            end,
            summary: summary.summary,
            mood: summary.mood,
            topics: summary.topics,
            relationship_type: Some(summary.relationship_type),
        }
    }

    pub fn placeholder(id: usize, start: String, end: String, summary: &str) -> Self {
        Self {
            id,
            start,
            end,
            summary: summary.to_string(),
            mood: Mood::Neutral,
            topics: Vec::new(),
            relationship_type: None,
        }
    }
}

/// A session whose summarizer call failed. It has no entry in
/// [`AnalysisReport::results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionFailure {
    pub id: usize,
    pub start: String,
    pub end: String,
    pub error: String,
}

/// Outcome of one analysis run over a whole transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub run_id: String,
    pub total_sessions: usize,
    /// Filled sessions in ascending `id` order.
    pub results: Vec<AnalysisResult>,
    #[serde(default)]
    pub failed_sessions: Vec<SessionFailure>,
}
