//! Report assembly
//!
//! Combines per-file [`AnalysisResult`]s into one [`Report`]. Summary topics
//! are re-ranked from the merged keyword tables, so a word that is frequent
//! overall still surfaces even if it never made one file's top ten.

pub mod markdown;
pub mod writer;

pub use markdown::to_markdown;
pub use writer::{write_report, OutputFormat, WriteOutcome};

use crate::analysis::{average, AnalysisResult, Timestamps, TopicTable, MAX_TOPICS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report document version
pub const REPORT_VERSION: &str = "1.0.0";

/// Complete analysis report, as written to `report-*.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub version: String,
    pub analyzed_at: String,
    pub source_path: String,
    /// Files discovered, including ones that failed
    pub files_analyzed: usize,
    pub sessions: Vec<SessionReport>,
    pub summary: ReportSummary,
    #[serde(default)]
    pub failures: Vec<FileFailure>,
    pub metadata: ReportMetadata,
}

/// One analyzed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Path relative to the analyzed root
    pub id: String,
    pub session_count: usize,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub code_blocks: usize,
    #[serde(default)]
    pub average_messages_per_session: f64,
    pub topics: Vec<String>,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl From<Timestamps> for DateRange {
    fn from(ts: Timestamps) -> Self {
        DateRange {
            start: ts.first,
            end: ts.last,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_code_blocks: usize,
    pub average_messages_per_session: f64,
    pub date_range: DateRange,
    pub top_topics: Vec<String>,
}

/// A file that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub analyzer_version: String,
    pub platform: String,
    pub generated_at: String,
}

/// Analysis of one file, with the full keyword table kept for roll-up
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub id: String,
    pub result: AnalysisResult,
    pub topics: TopicTable,
}

/// Accumulates file results and failures, then builds a [`Report`]
pub struct ReportBuilder {
    source_path: String,
    files_found: usize,
    analyzed_at: DateTime<Utc>,
    files: Vec<FileAnalysis>,
    failures: Vec<FileFailure>,
}

impl ReportBuilder {
    pub fn new(source_path: impl Into<String>, files_found: usize) -> Self {
        ReportBuilder {
            source_path: source_path.into(),
            files_found,
            analyzed_at: Utc::now(),
            files: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn add_file(&mut self, analysis: FileAnalysis) {
        self.files.push(analysis);
    }

    pub fn add_failure(&mut self, file: impl Into<String>, error: impl Into<String>) {
        self.failures.push(FileFailure {
            file: file.into(),
            error: error.into(),
        });
    }

    pub fn build(self) -> Report {
        let mut summary = ReportSummary::default();
        let mut range = Timestamps::default();
        let mut topics = TopicTable::new();

        for file in &self.files {
            let r = &file.result;
            summary.total_sessions += r.session_count;
            summary.total_messages += r.total_messages;
            summary.user_messages += r.user_messages;
            summary.assistant_messages += r.assistant_messages;
            summary.total_code_blocks += r.code_blocks;

            if let Some(first) = &r.timestamps.first {
                range.observe(first);
            }
            if let Some(last) = &r.timestamps.last {
                range.observe(last);
            }
            topics.merge(&file.topics);
        }

        summary.average_messages_per_session =
            average(summary.total_messages, summary.total_sessions);
        summary.date_range = range.into();
        summary.top_topics = topics.top(MAX_TOPICS);

        let sessions = self
            .files
            .into_iter()
            .map(|file| SessionReport {
                id: file.id,
                session_count: file.result.session_count,
                total_messages: file.result.total_messages,
                user_messages: file.result.user_messages,
                assistant_messages: file.result.assistant_messages,
                code_blocks: file.result.code_blocks,
                average_messages_per_session: file.result.average_messages_per_session,
                topics: file.result.topics,
                date_range: file.result.timestamps.into(),
            })
            .collect();

        let analyzed_at = self.analyzed_at.to_rfc3339();
        Report {
            version: REPORT_VERSION.to_string(),
            analyzed_at: analyzed_at.clone(),
            source_path: self.source_path,
            files_analyzed: self.files_found,
            sessions,
            summary,
            failures: self.failures,
            metadata: ReportMetadata {
                analyzer_version: env!("CARGO_PKG_VERSION").to_string(),
                platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
                generated_at: analyzed_at,
            },
        }
    }
}
