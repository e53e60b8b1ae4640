use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatlens::analysis::{Eta, SessionAnalyzer};
use chatlens::api::{create_router, AppState, ServiceInfo};
use chatlens::clustering::ThemeClusterer;
use chatlens::config::Config;
use chatlens::embeddings::EmbeddingProvider;
use chatlens::llm::LlmProvider;
use chatlens::models::{AnalysisReport, AnalysisResult, ThemeCluster};
use chatlens::segmentation::gap_from_minutes;
use chatlens::transcript::read_export;

#[derive(Parser)]
#[command(name = "chatlens")]
#[command(about = "Session summaries and recurring themes for chat transcripts")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Analyse an exported chat file and print the report as JSON
    Analyze {
        /// Path to the exported chat text file
        file: PathBuf,
        /// Silence (in minutes) that closes a session
        #[arg(long)]
        gap_minutes: Option<i64>,
        /// Also group the session summaries into themes
        #[arg(long)]
        cluster: bool,
        /// Similarity needed to join an existing theme
        #[arg(long)]
        threshold: Option<f32>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_name: Option<String>,
    participants: Vec<String>,
    #[serde(flatten)]
    report: AnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    clusters: Option<Vec<ThemeCluster>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Analyze {
            file,
            gap_minutes,
            cluster,
            threshold,
        } => analyze(config, file, gap_minutes, cluster, threshold).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chatlens=info,tower_http=debug".into());

    let json = std::env::var("CHATLENS_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so `analyze` can print its report on stdout.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_llm(config: &Config) -> LlmProvider {
    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - session summaries will fail until LLM_MODEL is set");
    }
    llm
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;
    match embeddings.detect_dimensions().await {
        Ok(actual) if actual != embeddings.dimensions() => tracing::warn!(
            configured = embeddings.dimensions(),
            actual,
            "EMBEDDING_DIMENSIONS does not match the embedding model"
        ),
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "Could not detect embedding dimensions"),
    }
    let llm = build_llm(&config);

    let services = ServiceInfo::from_providers(&llm, &embeddings);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, Arc::new(llm), Arc::new(embeddings), services);
    let app = create_router(state);

    tracing::info!("Chatlens starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let cancel_token = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    Ok(())
}

async fn analyze(
    config: Config,
    file: PathBuf,
    gap_minutes: Option<i64>,
    cluster: bool,
    threshold: Option<f32>,
) -> anyhow::Result<()> {
    let transcript =
        read_export(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    tracing::info!(
        messages = transcript.messages.len(),
        participants = transcript.participants.len(),
        "Loaded chat export"
    );

    let gap_minutes = gap_minutes.unwrap_or(config.analysis.gap_minutes);
    gap_from_minutes(gap_minutes).context("Invalid --gap-minutes")?;

    let analyzer = SessionAnalyzer::new(Arc::new(build_llm(&config)), config.analysis.clone());

    let eta = Eta::start();
    let progress = |result: &AnalysisResult, completed: usize, total: usize| {
        let remaining = eta
            .remaining(completed, total)
            .map(|d| format!(" - est. {}s remaining", d.as_secs()))
            .unwrap_or_default();
        eprintln!("[{completed}/{total}] session {} done{remaining}", result.id);
    };

    let cancel_token = CancellationToken::new();
    let run = analyzer.analyze_report_with_gap(&transcript.messages, gap_minutes, &progress);
    let report = tokio::select! {
        report = run => report?,
        _ = shutdown_signal(cancel_token.clone()) => anyhow::bail!("Analysis interrupted"),
    };
    eprintln!(
        "Analysed {} sessions in {}s ({} failed)",
        report.total_sessions,
        eta.elapsed().as_secs(),
        report.failed_sessions.len()
    );

    let clusters = if cluster {
        let embeddings = EmbeddingProvider::new(&config.embeddings)?;
        let clusterer = ThemeClusterer::new(Arc::new(embeddings), config.clustering.clone());
        let threshold = threshold.unwrap_or(config.clustering.similarity_threshold);
        Some(
            clusterer
                .cluster_with_threshold(&report.results, threshold)
                .await?,
        )
    } else {
        None
    };

    let output = AnalyzeOutput {
        chat_name: transcript.chat_name,
        participants: transcript.participants,
        report,
        clusters,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel_token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}
