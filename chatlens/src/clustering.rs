//! Single-pass nearest-centroid grouping of session summaries into themes.

use std::collections::BTreeMap;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::concurrency::ConcurrencyLimiter;
use crate::config::ClusteringConfig;
use crate::embeddings::Embedder;
use crate::error::{ChatlensError, Result};
use crate::models::{AnalysisResult, ThemeCluster};
use crate::vector::{cosine_similarity, mean};

/// Text embedded in place of an empty summary.
pub const EMPTY_SUMMARY_TEXT: &str = "Short chat";
const UNNAMED_THEME: &str = "Conversation group";

/// An analysis result together with the embedding of its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedItem {
    pub result: AnalysisResult,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
struct Cluster {
    items: Vec<EmbeddedItem>,
    centroid: Vec<f32>,
}

impl Cluster {
    fn seed(item: EmbeddedItem) -> Self {
        Self {
            centroid: item.embedding.clone(),
            items: vec![item],
        }
    }

    fn push(&mut self, item: EmbeddedItem) {
        self.items.push(item);
        self.centroid = mean(self.items.iter().map(|it| it.embedding.as_slice()));
    }
}

/// Clusters built so far in one run.
///
/// Each inserted item joins the cluster whose centroid it is most similar to,
/// provided that similarity reaches the threshold, and otherwise seeds a new
/// cluster. Clusters are never merged, split or emptied, and an item is never
/// reassigned.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
    threshold: f32,
    dimensions: Option<usize>,
}

impl ClusterSet {
    pub fn new(threshold: f32) -> Self {
        Self {
            clusters: Vec::new(),
            threshold,
            dimensions: None,
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn centroid(&self, cluster: usize) -> Option<&[f32]> {
        self.clusters.get(cluster).map(|c| c.centroid.as_slice())
    }

    pub fn member_ids(&self, cluster: usize) -> Vec<usize> {
        self.clusters
            .get(cluster)
            .map(|c| c.items.iter().map(|it| it.result.id).collect())
            .unwrap_or_default()
    }

    /// Most similar cluster and its score. Only a strictly greater score
    /// replaces the current best, so the earliest cluster wins ties.
    pub fn best_match(&self, embedding: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, cluster) in self.clusters.iter().enumerate() {
            let score = cosine_similarity(embedding, &cluster.centroid);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best
    }

    /// Assign `item` and return the index of the cluster it landed in.
    pub fn insert(&mut self, item: EmbeddedItem) -> Result<usize> {
        if item.embedding.is_empty() {
            return Err(ChatlensError::Embedding(format!(
                "Empty embedding for segment {}",
                item.result.id
            )));
        }

        match self.dimensions {
            Some(expected) if expected != item.embedding.len() => {
                return Err(ChatlensError::DimensionMismatch {
                    expected,
                    actual: item.embedding.len(),
                });
            }
            Some(_) => {}
            None => self.dimensions = Some(item.embedding.len()),
        }

        match self.best_match(&item.embedding) {
            Some((index, score)) if score >= self.threshold => {
                self.clusters[index].push(item);
                Ok(index)
            }
            _ => {
                self.clusters.push(Cluster::seed(item));
                Ok(self.clusters.len() - 1)
            }
        }
    }

    /// Label each cluster by ordinal and the first member's summary.
    pub fn into_themes(self, label_chars: usize) -> Vec<ThemeCluster> {
        self.clusters
            .into_iter()
            .enumerate()
            .map(|(index, cluster)| {
                let mut mood_counts = BTreeMap::new();
                for item in &cluster.items {
                    *mood_counts.entry(item.result.mood).or_insert(0) += 1;
                }

                let first = cluster
                    .items
                    .first()
                    .map(|it| it.result.summary.as_str())
                    .unwrap_or_default();

                ThemeCluster {
                    name: theme_label(index + 1, first, label_chars),
                    segment_ids: cluster.items.iter().map(|it| it.result.id).collect(),
                    mood_counts,
                }
            })
            .collect()
    }
}

fn theme_label(ordinal: usize, summary: &str, label_chars: usize) -> String {
    let source = if summary.trim().is_empty() {
        UNNAMED_THEME
    } else {
        summary.trim()
    };

    let snippet: String = source.graphemes(true).take(label_chars).collect();
    if snippet.len() < source.len() {
        format!("Theme {ordinal} - {snippet}...")
    } else {
        format!("Theme {ordinal} - {snippet}")
    }
}

/// Embeds summaries and groups them with a [`ClusterSet`].
#[derive(Clone)]
pub struct ThemeClusterer {
    embedder: Arc<dyn Embedder>,
    config: ClusteringConfig,
}

impl ThemeClusterer {
    pub fn new(embedder: Arc<dyn Embedder>, config: ClusteringConfig) -> Self {
        Self { embedder, config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub async fn cluster(&self, items: &[AnalysisResult]) -> Result<Vec<ThemeCluster>> {
        self.cluster_with_threshold(items, self.config.similarity_threshold)
            .await
    }

    /// Any embedding failure fails the whole call. Embeddings may be fetched
    /// concurrently but are assigned strictly in input order.
    pub async fn cluster_with_threshold(
        &self,
        items: &[AnalysisResult],
        threshold: f32,
    ) -> Result<Vec<ThemeCluster>> {
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(ChatlensError::Validation(format!(
                "similarityThreshold must be within [-1, 1], got {threshold}"
            )));
        }

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embed_all(items).await?;

        let mut set = ClusterSet::new(threshold);
        for (result, embedding) in items.iter().zip(embeddings) {
            set.insert(EmbeddedItem {
                result: result.clone(),
                embedding,
            })?;
        }

        tracing::info!(
            segments = items.len(),
            clusters = set.len(),
            threshold,
            "Clustered session summaries"
        );

        Ok(set.into_themes(self.config.label_chars))
    }

    async fn embed_all(&self, items: &[AnalysisResult]) -> Result<Vec<Vec<f32>>> {
        let limiter = ConcurrencyLimiter::new(self.config.embed_concurrency);
        let embedder = self.embedder.as_ref();

        let tasks = items.iter().map(|item| {
            let text = if item.summary.trim().is_empty() {
                EMPTY_SUMMARY_TEXT
            } else {
                item.summary.as_str()
            };
            move || embedder.embed(text)
        });

        limiter.run(tasks).await.into_iter().collect()
    }
}
