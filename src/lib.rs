//! Claude Report - analysis of Claude Code session logs
//!
//! This crate provides:
//! - JSONL session log decoding and session building
//! - Per-file statistics and corpus-wide topic ranking
//! - JSON, Markdown and PDF report output
//! - A project index over the Claude Code projects directory
//! - AI analysis through the local Claude CLI, with a statistics fallback
//! - HTTP API for the web dashboard
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use claude_report::pipeline::run_analysis;
//!
//! let report = run_analysis(Path::new("~/.claude/projects/my-app"), 4).await?;
//! println!("{} sessions", report.summary.total_sessions);
//! ```
//!
//! As a CLI:
//! ```text
//! claude-report analyze ~/.claude/projects/my-app -f markdown
//! claude-report serve --port 3001
//! ```

pub mod ai;
pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod projects;
pub mod render;
pub mod report;
pub mod subprocess;

// Re-export main types for convenience
pub use config::Config;
pub use error::{CoreError, Result};

use std::path::PathBuf;

/// Core service that owns the configuration and starts the server
pub struct Core {
    /// Effective configuration (file, env and CLI overrides applied)
    pub config: Config,

    /// Where settings changes are persisted
    config_path: PathBuf,
}

impl Core {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Core {
            config,
            config_path,
        }
    }

    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// Start the HTTP API server; returns on shutdown
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        tracing::info!("Projects directory: {}", self.config.projects_dir().display());
        tracing::info!("Reports directory: {}", self.config.reports_dir().display());

        let state = api::AppState::detect(self.config.clone(), self.config_path.clone()).await;
        match &state.pdf {
            Some(pdf) => tracing::info!("PDF rendering via {}", pdf.browser().display()),
            None => tracing::warn!("No headless browser found, PDF output is disabled"),
        }
        api::serve(addr, state).await
    }
}
