mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;

use chatlens::analysis::{NoProgress, SessionAnalyzer, OVERSIZED_SUMMARY, TRIVIAL_SUMMARY};
use chatlens::config::AnalysisConfig;
use chatlens::error::ChatlensError;
use chatlens::models::{AnalysisResult, Message, Mood};
use chatlens::transcript::parse_export;

use common::{daily_messages, init_test_logger, RecordingSummarizer};

fn analyzer_with(summarizer: Arc<RecordingSummarizer>, concurrency: usize) -> SessionAnalyzer {
    let config = AnalysisConfig {
        concurrency,
        ..AnalysisConfig::default()
    };
    SessionAnalyzer::new(summarizer, config)
}

fn record_progress() -> (
    Arc<Mutex<Vec<(usize, usize, usize)>>>,
    impl Fn(&AnalysisResult, usize, usize) + Send + Sync,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let sink = move |result: &AnalysisResult, completed: usize, total: usize| {
        sink_events.lock().unwrap().push((result.id, completed, total));
    };
    (events, sink)
}

#[tokio::test(start_paused = true)]
async fn results_are_ordered_by_id_whatever_the_completion_order() {
    init_test_logger();

    // Earlier sessions take longer, so they settle last.
    let summarizer = Arc::new(RecordingSummarizer::with_delay(|transcript| {
        let day: u64 = transcript
            .split_whitespace()
            .nth(3)
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        Duration::from_secs(10 - day)
    }));
    let analyzer = analyzer_with(summarizer.clone(), 8);
    let messages = daily_messages(&[
        "session number 1 about the garden",
        "session number 2 about the garden",
        "session number 3 about the garden",
        "session number 4 about the garden",
    ]);

    let (events, sink) = record_progress();
    let report = analyzer.analyze_report(&messages, &sink).await.unwrap();

    let ids: Vec<usize> = report.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(report.results[0].start, "1/1/24 9:00 AM");

    let events = events.lock().unwrap().clone();
    let arrival: Vec<usize> = events.iter().map(|(id, _, _)| *id).collect();
    assert_eq!(arrival, vec![4, 3, 2, 1]);
    let completed: Vec<usize> = events.iter().map(|(_, c, _)| *c).collect();
    assert_eq!(completed, vec![1, 2, 3, 4]);
    assert!(events.iter().all(|(_, _, total)| *total == 4));
}

#[tokio::test(start_paused = true)]
async fn limiter_caps_summarizer_calls_in_flight() {
    let summarizer = Arc::new(RecordingSummarizer::with_delay(|_| Duration::from_secs(1)));
    let analyzer = analyzer_with(summarizer.clone(), 2);
    let messages = daily_messages(&[
        "first conversation of the week",
        "second conversation of the week",
        "third conversation of the week",
        "fourth conversation of the week",
        "fifth conversation of the week",
    ]);

    let started = tokio::time::Instant::now();
    let results = analyzer.analyze(&messages, &NoProgress).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 5);
    assert_eq!(summarizer.calls(), 5);
    assert_eq!(summarizer.peak_in_flight(), 2);
    assert!(
        elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4),
        "five one-second calls two at a time should take three seconds, took {elapsed:?}"
    );
}

/// Delay in seconds given by the number each message text starts with.
fn delay_from_text(transcript: &str) -> Duration {
    let secs = transcript
        .split_whitespace()
        .nth(1)
        .and_then(|word| word.parse().ok())
        .unwrap_or(0);
    Duration::from_secs(secs)
}

#[tokio::test(start_paused = true)]
async fn one_failure_does_not_sink_the_run() {
    let summarizer = Arc::new(RecordingSummarizer::with_delay(delay_from_text));
    let analyzer = analyzer_with(summarizer.clone(), 3);
    let messages = daily_messages(&[
        "1 a calm chat about weekend plans",
        "2 boom this one makes the model fail",
        "3 another calm chat about dinner",
    ]);

    let (events, sink) = record_progress();
    let report = analyzer.analyze_report(&messages, &sink).await.unwrap();

    assert_eq!(report.total_sessions, 3);
    assert_eq!(
        report.results.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert_eq!(report.failed_sessions.len(), 1);
    assert_eq!(report.failed_sessions[0].id, 2);
    assert_eq!(report.failed_sessions[0].start, "1/2/24 9:00 AM");

    // The failed session still counts as settled, so `completed` skips 2.
    let events = events.lock().unwrap().clone();
    assert_eq!(events, vec![(1, 1, 3), (3, 3, 3)]);
}

#[tokio::test(start_paused = true)]
async fn last_settled_failure_leaves_progress_short_of_total() {
    let summarizer = Arc::new(RecordingSummarizer::with_delay(delay_from_text));
    let analyzer = analyzer_with(summarizer.clone(), 3);
    let messages = daily_messages(&[
        "1 a calm chat about weekend plans",
        "5 boom this one makes the model fail",
        "2 another calm chat about dinner",
    ]);

    let (events, sink) = record_progress();
    let report = analyzer.analyze_report(&messages, &sink).await.unwrap();

    let events = events.lock().unwrap().clone();
    assert_eq!(events, vec![(1, 1, 3), (3, 2, 3)]);
    assert_eq!(report.total_sessions, 3);
    assert_eq!(report.results.len() + report.failed_sessions.len(), 3);
}

#[tokio::test]
async fn transcript_length_boundary_is_inclusive() {
    let summarizer = Arc::new(RecordingSummarizer::instant());
    let analyzer = analyzer_with(summarizer.clone(), 2);

    // "Ana: " plus the text gives the transcript length.
    let at_limit = "a".repeat(50_000 - 5);
    let over_limit = "b".repeat(50_001 - 5);
    let messages = daily_messages(&[&at_limit, &over_limit]);

    let results = analyzer.analyze(&messages, &NoProgress).await.unwrap();

    assert_eq!(summarizer.calls(), 1);
    assert_ne!(results[0].summary, OVERSIZED_SUMMARY);
    assert_eq!(results[0].relationship_type.is_some(), true);
    assert_eq!(results[1].summary, OVERSIZED_SUMMARY);
    assert_eq!(results[1].mood, Mood::Neutral);
    assert!(results[1].topics.is_empty());
}

#[tokio::test]
async fn blank_sessions_are_placeholders() {
    let summarizer = Arc::new(RecordingSummarizer::instant());
    let analyzer = analyzer_with(summarizer.clone(), 2);
    let messages = vec![
        Message::new("Ana", "1/1/24", "9:00 AM", "   "),
        Message::new("Ben", "1/1/24", "9:01 AM", ""),
        Message::new("Ana", "1/3/24", "9:00 AM", "hi"),
    ];

    let results = analyzer.analyze(&messages, &NoProgress).await.unwrap();

    assert_eq!(summarizer.calls(), 0);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.summary == TRIVIAL_SUMMARY));
    assert_eq!(results[0].end, "1/1/24 9:01 AM");
}

#[tokio::test]
async fn bad_timestamp_fails_before_any_call() {
    let summarizer = Arc::new(RecordingSummarizer::instant());
    let analyzer = analyzer_with(summarizer.clone(), 2);
    let mut messages = daily_messages(&["a perfectly ordinary conversation"]);
    messages.push(Message::new("Ben", "31/31/24", "9:00 AM", "broken date"));

    let err = analyzer.analyze(&messages, &NoProgress).await.unwrap_err();

    assert!(matches!(err, ChatlensError::InvalidTimestamp { .. }));
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn runs_are_deterministic() {
    let summarizer = Arc::new(RecordingSummarizer::instant());
    let analyzer = analyzer_with(summarizer, 4);
    let messages = daily_messages(&[
        "talking about work deadlines today",
        "planning the summer trip together",
        "feeling sad about the weather lately",
    ]);

    let first = analyzer.analyze(&messages, &NoProgress).await.unwrap();
    let second = analyzer.analyze(&messages, &NoProgress).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn export_text_flows_through_the_pipeline() {
    let export = "\
[1/5/24, 9:00:00\u{202F}AM] Ana: morning, are we still meeting at ten?
[1/5/24, 9:02:10\u{202F}AM] Ben: yes, same room as last time
see you there
[1/5/24, 8:30:00\u{202F}PM] Ana: that meeting ran long, sorry about that";

    let transcript = parse_export(export);
    assert_eq!(transcript.messages.len(), 3);

    let summarizer = Arc::new(RecordingSummarizer::instant());
    let analyzer = analyzer_with(summarizer.clone(), 2);
    let report = analyzer
        .analyze_report_with_gap(&transcript.messages, 240, &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.total_sessions, 2);
    assert_eq!(report.results[0].end, "1/5/24 9:02:10\u{202F}AM");
    assert_eq!(
        report.results[1].summary,
        "Ana: that meeting ran long, sorry about that"
    );
    assert_eq!(summarizer.calls(), 2);
}
