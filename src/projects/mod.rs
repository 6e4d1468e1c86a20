//! Claude Code project index.
//!
//! Each non-hidden directory under the projects base directory is a project;
//! every `*.jsonl` below it is a session. Session lists are cached per project
//! and rebuilt when the file count or newest modification time changes.
//! Analysis status is always read from the reports directory.

pub mod layout;

pub use layout::{latest_report, ReportLayout};

use crate::analysis::Timestamps;
use crate::error::{CoreError, Result};
use crate::parser::{parse_file, Session};
use crate::pipeline::{self, find_jsonl_files};
use crate::report::{write_report, OutputFormat, Report};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;

/// A project directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub path: String,
    pub last_modified: String,
    pub session_count: usize,
    pub analyzed: bool,
}

/// A session log file inside a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Path relative to the project directory
    pub id: String,
    pub project_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub message_count: usize,
    pub analyzed: bool,
}

/// Sessions and messages on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateStats {
    pub date: String,
    pub session_count: usize,
    pub analyzed_count: usize,
    pub total_messages: usize,
}

/// Group sessions by day, newest day first
pub fn date_stats(sessions: &[SessionSummary]) -> Vec<DateStats> {
    let mut by_date: BTreeMap<&str, DateStats> = BTreeMap::new();
    for session in sessions {
        let stats = by_date
            .entry(session.date.as_str())
            .or_insert_with(|| DateStats {
                date: session.date.clone(),
                session_count: 0,
                analyzed_count: 0,
                total_messages: 0,
            });
        stats.session_count += 1;
        stats.analyzed_count += usize::from(session.analyzed);
        stats.total_messages += session.message_count;
    }
    by_date.into_values().rev().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    files: usize,
    newest: Option<SystemTime>,
}

struct LogFile {
    path: PathBuf,
    modified: SystemTime,
}

struct CachedSessions {
    fingerprint: Fingerprint,
    sessions: Vec<SessionSummary>,
}

struct IndexPaths {
    base_dir: PathBuf,
    layout: ReportLayout,
}

/// Shared, explicitly owned cache of project session lists
pub struct ProjectIndex {
    paths: RwLock<IndexPaths>,
    sessions: RwLock<HashMap<String, CachedSessions>>,
}

impl ProjectIndex {
    pub fn new(base_dir: PathBuf, reports_dir: PathBuf) -> Self {
        ProjectIndex {
            paths: RwLock::new(IndexPaths {
                base_dir,
                layout: ReportLayout::new(reports_dir),
            }),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Point at new directories and drop everything cached
    pub async fn reconfigure(&self, base_dir: PathBuf, reports_dir: PathBuf) {
        *self.paths.write().await = IndexPaths {
            base_dir,
            layout: ReportLayout::new(reports_dir),
        };
        self.sessions.write().await.clear();
        tracing::info!("Project index reconfigured");
    }

    pub async fn base_dir(&self) -> PathBuf {
        self.paths.read().await.base_dir.clone()
    }

    pub async fn layout(&self) -> ReportLayout {
        self.paths.read().await.layout.clone()
    }

    /// Directory of project `id`; rejects ids that would escape the base dir
    pub async fn project_path(&self, id: &str) -> Result<PathBuf> {
        if !is_plain_name(id) {
            return Err(CoreError::Validation(format!("Invalid project id: {}", id)));
        }
        let path = self.base_dir().await.join(id);
        if !path.is_dir() {
            return Err(CoreError::NotFound("Project", id.to_string()));
        }
        Ok(path)
    }

    /// Absolute path of a session log inside a project
    pub async fn session_path(&self, project_id: &str, session_id: &str) -> Result<PathBuf> {
        let project = self.project_path(project_id).await?;
        check_session_id(session_id)?;
        let path = project.join(session_id);
        if !path.is_file() {
            return Err(CoreError::NotFound("Session", session_id.to_string()));
        }
        Ok(path)
    }

    /// All projects, most recently modified first
    pub async fn scan_projects(&self) -> Result<Vec<ProjectSummary>> {
        let base_dir = self.base_dir().await;
        let layout = self.layout().await;

        let mut entries = match tokio::fs::read_dir(&base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Projects directory not found: {}", base_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type().await?.is_dir() {
                continue;
            }
            let path = entry.path();
            let modified = entry.metadata().await?.modified()?;
            let session_count = list_logs(&path).await?.len();
            let analyzed = layout::has_report(&layout.project_dir(&name)).await;

            projects.push((
                modified,
                ProjectSummary {
                    id: name.clone(),
                    name,
                    path: path.display().to_string(),
                    last_modified: DateTime::<Utc>::from(modified).to_rfc3339(),
                    session_count,
                    analyzed,
                },
            ));
        }

        projects.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        tracing::debug!("Scanned {} projects in {}", projects.len(), base_dir.display());
        Ok(projects.into_iter().map(|(_, p)| p).collect())
    }

    /// Sessions of a project, newest first
    pub async fn project_sessions(&self, project_id: &str) -> Result<Vec<SessionSummary>> {
        let project = self.project_path(project_id).await?;
        let logs = list_logs(&project).await?;
        let fingerprint = Fingerprint {
            files: logs.len(),
            newest: logs.iter().map(|l| l.modified).max(),
        };

        let cached = {
            let cache = self.sessions.read().await;
            cache
                .get(project_id)
                .filter(|c| c.fingerprint == fingerprint)
                .map(|c| c.sessions.clone())
        };

        let mut sessions = match cached {
            Some(sessions) => sessions,
            None => {
                tracing::debug!("Rebuilding session list for {}", project_id);
                let sessions = build_sessions(project_id, &project, &logs).await;
                self.sessions.write().await.insert(
                    project_id.to_string(),
                    CachedSessions {
                        fingerprint,
                        sessions: sessions.clone(),
                    },
                );
                sessions
            }
        };

        let layout = self.layout().await;
        for session in &mut sessions {
            session.analyzed =
                layout::has_report(&layout.session_dir(project_id, &session.id)).await;
        }
        Ok(sessions)
    }

    pub async fn sessions_by_date(
        &self,
        project_id: &str,
        date: &str,
    ) -> Result<Vec<SessionSummary>> {
        Ok(self
            .project_sessions(project_id)
            .await?
            .into_iter()
            .filter(|s| s.date == date)
            .collect())
    }

    /// Latest stored whole-project analysis
    pub async fn project_analysis(&self, project_id: &str) -> Result<Option<Report>> {
        self.project_path(project_id).await?;
        let layout = self.layout().await;
        latest_report(&layout.project_dir(project_id)).await
    }

    /// Latest stored analysis of one session. The log itself may be gone.
    pub async fn session_analysis(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<Option<Report>> {
        self.project_path(project_id).await?;
        check_session_id(session_id)?;
        let layout = self.layout().await;
        latest_report(&layout.session_dir(project_id, session_id)).await
    }

    /// Analyze every session of a project and store the JSON report
    pub async fn analyze_project(&self, project_id: &str, concurrency: usize) -> Result<Report> {
        let project = self.project_path(project_id).await?;
        let report = pipeline::run_analysis(&project, concurrency).await?;
        let dir = self.layout().await.project_dir(project_id);
        write_report(&report, &dir, OutputFormat::Json, None).await?;
        Ok(report)
    }

    /// Analyze one session file and store the JSON report
    pub async fn analyze_session(&self, project_id: &str, session_id: &str) -> Result<Report> {
        let file = self.session_path(project_id, session_id).await?;
        let report = pipeline::run_analysis(&file, 1).await?;
        let dir = self.layout().await.session_dir(project_id, session_id);
        write_report(&report, &dir, OutputFormat::Json, None).await?;
        Ok(report)
    }

    /// Parsed sessions of one log file
    pub async fn read_session(&self, project_id: &str, session_id: &str) -> Result<Vec<Session>> {
        let file = self.session_path(project_id, session_id).await?;
        Ok(parse_file(&file, Some(session_id.to_string())).await?.sessions)
    }
}

/// A single path component that is not hidden
fn is_plain_name(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && Path::new(id).components().count() == 1
}

/// A relative `*.jsonl` path that stays inside its project
pub fn check_session_id(session_id: &str) -> Result<()> {
    let safe = Path::new(session_id)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if safe && session_id.ends_with(".jsonl") {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid session id: {}",
            session_id
        )))
    }
}

/// `*.jsonl` files under `dir` with their modification times
async fn list_logs(dir: &Path) -> Result<Vec<LogFile>> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<LogFile>> {
        find_jsonl_files(&dir)?
            .into_iter()
            .map(|path| -> Result<LogFile> {
                let modified = std::fs::metadata(&path)?.modified()?;
                Ok(LogFile { path, modified })
            })
            .collect()
    })
    .await
    .map_err(|e| CoreError::Io(std::io::Error::other(e)))?
}

async fn build_sessions(project_id: &str, project: &Path, logs: &[LogFile]) -> Vec<SessionSummary> {
    let mut sessions = Vec::with_capacity(logs.len());
    for log in logs {
        let id = pipeline::file_id(project, &log.path);
        let (span, message_count) = match parse_file(&log.path, Some(id.clone())).await {
            Ok(parsed) => {
                let messages: Vec<_> = parsed.sessions.iter().flat_map(|s| &s.messages).collect();
                let mut span = Timestamps::default();
                // First and last timestamp in file order
                let mut stamped = messages.iter().filter_map(|m| m.timestamp.as_deref());
                span.first = stamped.next().map(str::to_string);
                span.last = stamped.last().map(str::to_string).or_else(|| span.first.clone());
                (span, messages.len())
            }
            Err(e) => {
                tracing::warn!("Failed to read session {}: {}", log.path.display(), e);
                (Timestamps::default(), 0)
            }
        };

        let date = span
            .first
            .as_deref()
            .and_then(date_prefix)
            .unwrap_or_else(|| DateTime::<Utc>::from(log.modified).format("%Y-%m-%d").to_string());

        sessions.push(SessionSummary {
            id,
            project_id: project_id.to_string(),
            date,
            start_time: span.first,
            end_time: span.last,
            message_count,
            analyzed: false,
        });
    }

    sessions.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    sessions
}

/// `YYYY-MM-DD` from the start of a timestamp string
fn date_prefix(ts: &str) -> Option<String> {
    let prefix = ts.get(..10)?;
    chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .ok()
        .map(|_| prefix.to_string())
}
