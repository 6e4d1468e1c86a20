//! Scan a path for session logs and analyze them into a [`Report`]

use crate::analysis::analyze_with_topics;
use crate::error::{CoreError, Result};
use crate::parser::parse_file;
use crate::report::{FileAnalysis, Report, ReportBuilder};
use futures::stream::{self, Stream, StreamExt};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const LOG_EXTENSION: &str = "jsonl";

/// Result of analyzing one file
#[derive(Debug)]
pub enum FileOutcome {
    Analyzed(FileAnalysis),
    Failed { file: String, error: String },
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn is_log_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION)
}

/// Every `*.jsonl` file at or below `root`, sorted by path.
///
/// A file root is returned as-is when it has the right extension. Hidden
/// directories are not descended into.
pub fn find_jsonl_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(CoreError::NotFound("Path", root.display().to_string()));
    }
    if root.is_file() {
        return Ok(if is_log_file(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_log_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Id of `file` in a report: its path relative to `root`
pub fn file_id(root: &Path, file: &Path) -> String {
    match file.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().replace('\\', "/"),
        _ => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string()),
    }
}

/// Parse and aggregate one file
pub async fn analyze_file(root: &Path, file: &Path) -> FileOutcome {
    let id = file_id(root, file);
    match parse_file(file, Some(id.clone())).await {
        Ok(parsed) => {
            let (result, topics) = analyze_with_topics(&parsed.sessions);
            FileOutcome::Analyzed(FileAnalysis { id, result, topics })
        }
        Err(e) => FileOutcome::Failed {
            file: id,
            error: e.to_string(),
        },
    }
}

/// Outcomes of `files` as they complete, at most `concurrency` in flight.
///
/// Items come out in input order even when later files finish first.
pub fn analyze_stream(
    root: &Path,
    files: Vec<PathBuf>,
    concurrency: usize,
) -> impl Stream<Item = FileOutcome> + Send + 'static {
    let root = root.to_path_buf();
    stream::iter(files)
        .map(move |file| {
            let root = root.clone();
            async move { analyze_file(&root, &file).await }
        })
        .buffered(concurrency.max(1))
}

/// Analyze `files` with at most `concurrency` in flight; output keeps input order
pub async fn analyze_files(root: &Path, files: &[PathBuf], concurrency: usize) -> Vec<FileOutcome> {
    analyze_stream(root, files.to_vec(), concurrency)
        .collect()
        .await
}

/// Fold outcomes into a report
pub fn assemble(source: &Path, outcomes: Vec<FileOutcome>) -> Report {
    let mut builder = ReportBuilder::new(source.display().to_string(), outcomes.len());
    for outcome in outcomes {
        match outcome {
            FileOutcome::Analyzed(analysis) => builder.add_file(analysis),
            FileOutcome::Failed { file, error } => builder.add_failure(file, error),
        }
    }
    builder.build()
}

/// Find, analyze and assemble in one call
pub async fn run_analysis(root: &Path, concurrency: usize) -> Result<Report> {
    let files = find_jsonl_files(root)?;
    tracing::info!("Found {} JSONL files under {}", files.len(), root.display());

    let outcomes = analyze_files(root, &files, concurrency).await;
    let report = assemble(root, outcomes);

    tracing::info!(
        "Analyzed {} files: {} sessions, {} messages, {} failed",
        report.files_analyzed,
        report.summary.total_sessions,
        report.summary.total_messages,
        report.failures.len()
    );
    Ok(report)
}
