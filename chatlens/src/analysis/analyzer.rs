use std::sync::Arc;

use futures::StreamExt;
use nanoid::nanoid;

use crate::analysis::prepare::{build_transcript, classify, Prepared, TRIVIAL_SUMMARY};
use crate::analysis::progress::ProgressSink;
use crate::concurrency::ConcurrencyLimiter;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::llm::Summarizer;
use crate::models::{
    AnalysisReport, AnalysisResult, Message, Mood, RelationshipType, SessionFailure,
    SessionSummary,
};
use crate::segmentation::{segment_by_minutes, Session};

/// Reply for a single conversation too short to be worth a summarizer call.
pub const TOO_SHORT_SUMMARY: &str = "Conversation too short or empty.";

enum Outcome {
    Filled(AnalysisResult),
    Failed(SessionFailure),
}

/// Splits a transcript into sessions and summarizes each one, with at most
/// `concurrency` summarizer calls in flight per run.
#[derive(Clone)]
pub struct SessionAnalyzer {
    summarizer: Arc<dyn Summarizer>,
    config: AnalysisConfig,
}

impl SessionAnalyzer {
    pub fn new(summarizer: Arc<dyn Summarizer>, config: AnalysisConfig) -> Self {
        Self { summarizer, config }
    }

    /// Filled results in ascending `id` order. Sessions whose summarizer call
    /// failed are absent.
    pub async fn analyze(
        &self,
        messages: &[Message],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<AnalysisResult>> {
        Ok(self.analyze_report(messages, progress).await?.results)
    }

    /// Segment with the configured gap, then summarize every session.
    ///
    /// Fails only when a message timestamp cannot be parsed, before any
    /// summarizer call is made.
    pub async fn analyze_report(
        &self,
        messages: &[Message],
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisReport> {
        self.analyze_report_with_gap(messages, self.config.gap_minutes, progress)
            .await
    }

    pub async fn analyze_report_with_gap(
        &self,
        messages: &[Message],
        gap_minutes: i64,
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisReport> {
        let sessions = segment_by_minutes(messages, gap_minutes)?;
        tracing::info!(
            messages = messages.len(),
            sessions = sessions.len(),
            gap_minutes,
            "Segmented transcript"
        );

        Ok(self.analyze_sessions(&sessions, progress).await)
    }

    /// Summarize already segmented sessions. Session `i` gets id `i + 1`.
    pub async fn analyze_sessions(
        &self,
        sessions: &[Session],
        progress: &dyn ProgressSink,
    ) -> AnalysisReport {
        let run_id = nanoid!();
        let total = sessions.len();
        let limiter = ConcurrencyLimiter::new(self.config.concurrency);

        let tasks = sessions
            .iter()
            .enumerate()
            .map(|(index, session)| move || self.settle(index + 1, session));

        let mut slots: Vec<Option<AnalysisResult>> = vec![None; total];
        let mut failed_sessions = Vec::new();
        let mut completed = 0;

        let mut settled = std::pin::pin!(limiter.stream(tasks));
        while let Some((index, outcome)) = settled.next().await {
            completed += 1;
            match outcome {
                Outcome::Filled(result) => {
                    progress.on_progress(&result, completed, total);
                    slots[index] = Some(result);
                }
                Outcome::Failed(failure) => failed_sessions.push(failure),
            }
        }

        failed_sessions.sort_by_key(|failure: &SessionFailure| failure.id);
        let results: Vec<AnalysisResult> = slots.into_iter().flatten().collect();

        tracing::info!(
            run_id = %run_id,
            total,
            filled = results.len(),
            failed = failed_sessions.len(),
            "Analysis run finished"
        );

        AnalysisReport {
            run_id,
            total_sessions: total,
            results,
            failed_sessions,
        }
    }

    /// Summarize one free-form conversation without segmenting it.
    pub async fn summarize_conversation(&self, text: &str) -> Result<SessionSummary> {
        if text.trim().chars().count() < self.config.min_transcript_chars {
            return Ok(SessionSummary {
                summary: TOO_SHORT_SUMMARY.to_string(),
                mood: Mood::Neutral,
                topics: Vec::new(),
                relationship_type: RelationshipType::default(),
            });
        }

        self.summarizer.summarize(text).await
    }

    async fn settle(&self, id: usize, session: &Session) -> Outcome {
        let start = session.start();
        let end = session.end();

        let prepared = classify(
            build_transcript(session.messages()),
            self.config.max_transcript_chars,
            self.config.min_transcript_chars,
        );

        let transcript = match prepared {
            Prepared::Submit(transcript) => transcript,
            skipped => {
                tracing::warn!(session = id, reason = ?skipped, "Skipping session");
                let summary = skipped.placeholder_summary().unwrap_or(TRIVIAL_SUMMARY);
                return Outcome::Filled(AnalysisResult::placeholder(id, start, end, summary));
            }
        };

        tracing::debug!(session = id, messages = session.len(), "Summarizing session");

        match self.summarizer.summarize(&transcript).await {
            Ok(summary) => Outcome::Filled(AnalysisResult::from_summary(id, start, end, summary)),
            Err(error) => {
                tracing::error!(session = id, %error, "Session summarization failed");
                Outcome::Failed(SessionFailure {
                    id,
                    start,
                    end,
                    error: error.to_string(),
                })
            }
        }
    }
}
