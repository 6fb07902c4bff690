//! semchunk: split a document into token-bounded, semantically coherent chunks.
//!
//! Reads one PDF, text or markdown file, runs it through extraction,
//! normalization and the configured chunking strategy, and prints the chunks
//! to stdout. Logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::Notify;
use tracing::{info, warn};

use semchunk_core::config::load_dotenv;
use semchunk_core::{ChunkStrategy, Config};
use semchunk_ingest::{ChunkedDocument, DocumentPipeline};

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Semantic document chunker.
#[derive(Parser, Debug)]
#[command(name = "semchunk", version, about)]
struct Cli {
    /// Document to chunk (.pdf, .txt, .md).
    file: Option<PathBuf>,

    /// Chunking strategy: semantic or fixed.
    #[arg(long)]
    strategy: Option<ChunkStrategy>,

    /// Per-chunk token ceiling.
    #[arg(long)]
    token_limit: Option<usize>,

    /// Page normalization: whitespace, llm or none.
    #[arg(long)]
    normalize: Option<String>,

    /// Sentence segmenter: unicode or punctuation.
    #[arg(long)]
    segmenter: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Print the effective configuration (secrets redacted) and exit.
    #[arg(long)]
    show_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(strategy) = self.strategy {
            config.chunking.strategy = strategy;
        }
        if let Some(limit) = self.token_limit {
            config.chunking.token_limit = limit;
        }
        if let Some(mode) = &self.normalize {
            config.normalization.mode = mode.clone();
        }
        if let Some(segmenter) = &self.segmenter {
            config.normalization.segmenter = segmenter.clone();
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    load_dotenv();
    let mut config = Config::from_env();
    cli.apply_overrides(&mut config);

    if cli.show_config {
        let mut summary = config.redacted_summary();
        summary["available_profiles"] = serde_json::json!(Config::available_profiles());
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    config
        .chunking
        .validate()
        .context("invalid chunking configuration")?;
    config.log_summary();

    let path = cli.file.as_ref().context("no input file given")?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file name: {}", path.display()))?;

    let pipeline = DocumentPipeline::from_config(&config).context("failed to build pipeline")?;

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if shutdown_signal().await {
            info!("shutdown signal received, cancelling");
            trigger.notify_one();
        }
    });

    let doc = pipeline
        .run_with_shutdown(&bytes, filename, shutdown)
        .await
        .with_context(|| format!("failed to chunk {filename}"))?;

    info!(
        filename = %doc.filename,
        pages = doc.page_count,
        chunks = doc.chunks.len(),
        "document chunked"
    );

    print_document(&doc, cli.format)
}

fn print_document(doc: &ChunkedDocument, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &doc.chunks)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for (i, chunk) in doc.chunks.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "{}", chunk.content)?;
            }
        }
    }
    Ok(())
}

/// Wait for SIGINT or SIGTERM. Returns false if no handler could be installed.
async fn shutdown_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                return tokio::signal::ctrl_c().await.is_ok();
            }
        };
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.is_ok(),
            _ = sigterm.recv() => true,
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to listen for ctrl_c");
                false
            }
        }
    }
}
