use std::time::Duration;

use tokio::time::Instant;

use crate::models::AnalysisResult;

/// Receives each filled session as soon as it settles.
///
/// `completed` counts settled sessions (failed ones included) and never
/// decreases within a run; `total` is the number of sessions in the run.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, result: &AnalysisResult, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(&AnalysisResult, usize, usize) + Send + Sync,
{
    fn on_progress(&self, result: &AnalysisResult, completed: usize, total: usize) {
        self(result, completed, total)
    }
}

/// Discards progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _result: &AnalysisResult, _completed: usize, _total: usize) {}
}

/// Estimates time remaining from the average time per settled session.
#[derive(Debug, Clone, Copy)]
pub struct Eta {
    started: Instant,
}

impl Eta {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `None` until at least one session has settled.
    pub fn remaining(&self, completed: usize, total: usize) -> Option<Duration> {
        if completed == 0 {
            return None;
        }
        let per_session = self.elapsed() / completed as u32;
        Some(per_session * total.saturating_sub(completed) as u32)
    }
}
