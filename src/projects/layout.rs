//! Where analysis artifacts for a project live in the reports directory.
//!
//! ```text
//! <reports>/<project>/report-*.json             project analysis
//! <reports>/<project>/sessions/<key>/report-*   single session
//! <reports>/<project>/ai-analysis-<project>[-<key>].json
//! ```

use crate::error::{CoreError, Result};
use crate::report::Report;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ReportLayout {
    root: PathBuf,
}

impl ReportLayout {
    pub fn new(root: PathBuf) -> Self {
        ReportLayout { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    pub fn session_dir(&self, project_id: &str, session_id: &str) -> PathBuf {
        self.project_dir(project_id)
            .join("sessions")
            .join(session_key(session_id))
    }

    pub fn ai_result_path(&self, project_id: &str, session_id: Option<&str>) -> PathBuf {
        let name = match session_id {
            Some(session) => format!("ai-analysis-{}-{}.json", project_id, session_key(session)),
            None => format!("ai-analysis-{}.json", project_id),
        };
        self.project_dir(project_id).join(name)
    }
}

/// Flatten a relative session path into one directory/file name component
pub fn session_key(session_id: &str) -> String {
    session_id
        .trim_end_matches(".jsonl")
        .replace(['/', '\\'], "__")
}

fn is_report_json(name: &str) -> bool {
    name.starts_with("report-") && name.ends_with(".json")
}

/// Newest `report-*.json` in `dir`. File names sort chronologically.
pub async fn latest_report_path(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_report_json(&name) && latest.as_ref().map_or(true, |l| name > *l) {
            latest = Some(name);
        }
    }
    Ok(latest.map(|name| dir.join(name)))
}

/// Load the newest report in `dir`
pub async fn latest_report(dir: &Path) -> Result<Option<Report>> {
    let Some(path) = latest_report_path(dir).await? else {
        return Ok(None);
    };
    let content = tokio::fs::read_to_string(&path).await?;
    let report = serde_json::from_str(&content).map_err(|e| {
        CoreError::Parser(format!("Invalid report {}: {}", path.display(), e))
    })?;
    Ok(Some(report))
}

pub async fn has_report(dir: &Path) -> bool {
    matches!(latest_report_path(dir).await, Ok(Some(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_flattens_paths() {
        assert_eq!(session_key("abc.jsonl"), "abc");
        assert_eq!(session_key("sub/dir/abc.jsonl"), "sub__dir__abc");
    }

    #[test]
    fn test_ai_result_names() {
        let layout = ReportLayout::new(PathBuf::from("/r"));
        assert_eq!(
            layout.ai_result_path("proj", None),
            PathBuf::from("/r/proj/ai-analysis-proj.json")
        );
        assert_eq!(
            layout.ai_result_path("proj", Some("s1.jsonl")),
            PathBuf::from("/r/proj/ai-analysis-proj-s1.json")
        );
    }

    #[tokio::test]
    async fn test_latest_report_picks_newest_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report-20240101-000000-000.json"), "{}").unwrap();
        std::fs::write(dir.path().join("report-20240301-000000-000.json"), "{}").unwrap();
        std::fs::write(dir.path().join("report-20240401-000000-000.md"), "").unwrap();
        std::fs::write(dir.path().join("ai-analysis-x.json"), "{}").unwrap();

        let latest = latest_report_path(dir.path()).await.unwrap().unwrap();
        assert!(latest.ends_with("report-20240301-000000-000.json"));
        assert!(has_report(dir.path()).await);
    }

    #[tokio::test]
    async fn test_missing_dir_has_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(latest_report(&missing).await.unwrap().is_none());
        assert!(!has_report(&missing).await);
    }
}
