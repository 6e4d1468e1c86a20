//! Claude Report CLI - analyze Claude Code session logs or serve the dashboard API

use claude_report::config::expand_path;
use claude_report::pipeline::{analyze_stream, assemble, find_jsonl_files, FileOutcome};
use claude_report::render::PdfRenderer;
use claude_report::report::{write_report, OutputFormat};
use claude_report::{Config, Core};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "claude-report")]
#[command(author = "Claude Report Team")]
#[command(version)]
#[command(about = "Analyze Claude Code session logs and generate reports", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "~/.claude-report/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a session log file or a directory of them
    Analyze {
        /// JSONL file or directory to scan
        path: PathBuf,

        /// Output directory (default: reports_dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(
            short,
            long,
            default_value = "all",
            value_parser = ["json", "markdown", "md", "pdf", "all"]
        )]
        format: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Override server host
        #[arg(long)]
        host: Option<String>,

        /// Override server port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = expand_path(&args.config);

    if let Command::Init = args.command {
        init_logging(args.verbose, None);
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let config_exists = config_path.exists();
    let mut config = if config_exists {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    let _log_guard = init_logging(args.verbose, config.logging.dir.as_deref());
    if !config_exists {
        tracing::debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }

    match args.command {
        Command::Analyze {
            path,
            output,
            format,
        } => {
            let format = OutputFormat::parse_format(&format)
                .ok_or_else(|| anyhow::anyhow!("Unknown format: {}", format))?;
            let output = output.map(|o| expand_path(&o)).unwrap_or_else(|| config.reports_dir());
            run_analyze(&config, &expand_path(&path), &output, format).await
        }
        Command::Serve { host, port } => {
            // Apply CLI overrides
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            let core = Core::new(config, config_path);
            core.start_api_server().await?;
            Ok(())
        }
        Command::Init => Ok(()),
    }
}

/// Install the stderr subscriber plus an optional daily log file.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(
    verbose: bool,
    log_dir: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("claude_report={},tower_http=debug", log_level).into());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(expand_path(dir), "claude-report.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn run_analyze(
    config: &Config,
    path: &Path,
    output: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!("✗ Path does not exist: {}", path.display());
        std::process::exit(1);
    }

    let files = find_jsonl_files(path)?;
    if files.is_empty() {
        tracing::warn!("No JSONL files found under {}", path.display());
        println!("No JSONL files found under {}", path.display());
        return Ok(());
    }

    println!("Analyzing {} files under {}", files.len(), path.display());
    let mut outcomes = Vec::with_capacity(files.len());
    let mut progress = std::pin::pin!(analyze_stream(path, files, config.analysis.concurrency));
    while let Some(outcome) = progress.next().await {
        match &outcome {
            FileOutcome::Analyzed(analysis) => println!(
                "  ✓ {} ({} messages)",
                analysis.id, analysis.result.total_messages
            ),
            FileOutcome::Failed { file, error } => println!("  ✗ {}: {}", file, error),
        }
        outcomes.push(outcome);
    }

    let report = assemble(path, outcomes);
    let renderer = if matches!(format, OutputFormat::Pdf | OutputFormat::All) {
        PdfRenderer::detect(&config.render).await
    } else {
        None
    };
    if let Some(renderer) = &renderer {
        tracing::debug!("Rendering PDF with {}", renderer.browser().display());
    }

    let outcome = write_report(&report, output, format, renderer.as_ref()).await?;

    let s = &report.summary;
    println!();
    println!(
        "Sessions: {}  Messages: {}  Code blocks: {}",
        s.total_sessions, s.total_messages, s.total_code_blocks
    );
    if !s.top_topics.is_empty() {
        println!("Top topics: {}", s.top_topics.join(", "));
    }
    println!();
    for written in outcome.written() {
        println!("Report saved: {}", written.display());
    }
    for (format, error) in &outcome.failures {
        println!("✗ {:?} output failed: {}", format, error);
    }

    Ok(())
}
