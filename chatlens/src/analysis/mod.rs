//! Per-session summarization of a segmented transcript.

mod analyzer;
mod prepare;
mod progress;

pub use analyzer::{SessionAnalyzer, TOO_SHORT_SUMMARY};
pub use prepare::{build_transcript, classify, Prepared, OVERSIZED_SUMMARY, TRIVIAL_SUMMARY};
pub use progress::{Eta, NoProgress, ProgressSink};
