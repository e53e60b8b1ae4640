use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Mood;

/// A recurring theme found across session summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThemeCluster {
    /// Display label: ordinal plus a snippet of the first member's summary.
    pub name: String,
    /// Member session ids in assignment order.
    pub segment_ids: Vec<usize>,
    #[schema(value_type = std::collections::HashMap<String, usize>)]
    pub mood_counts: BTreeMap<Mood, usize>,
}
