//! AI analysis results: interpretation, fallback and storage

use super::cli::DetectedCli;
use super::prompt::{project_prompt, session_prompt, SessionDigest};
use super::queue::AiTaskQueue;
use crate::analysis::analyze;
use crate::error::Result;
use crate::parser::Session;
use crate::projects::ReportLayout;
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Model tag for answers produced by the local CLI
pub const MODEL_CLI: &str = "claude-code-local";
/// Model tag for statistics-only answers
pub const MODEL_FALLBACK: &str = "fallback-statistics";

/// Responses shorter than this are replaced by [`default_document`]
const MIN_RESPONSE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    fn from_message_count(count: usize) -> Self {
        if count > 100 {
            Complexity::High
        } else if count > 50 {
            Complexity::Medium
        } else {
            Complexity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    /// Full Markdown answer
    pub summary: String,
    pub key_insights: Vec<String>,
    pub technical_details: Vec<String>,
    pub recommendations: Vec<String>,
    pub complexity: Complexity,
    pub topics: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisResult {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub analysis: AiAnalysis,
    pub analyzed_at: String,
    pub model: String,
}

/// Statistics the fallback analysis is built from
#[derive(Debug, Clone, Default)]
pub struct FallbackStats {
    pub message_count: usize,
    pub code_blocks: usize,
    pub average_messages_per_session: Option<f64>,
    pub topics: Vec<String>,
}

/// Placeholder answer for empty or truncated responses
pub fn default_document() -> String {
    "# Session Analysis Report\n\n\
     The session was analyzed.\n\n\
     ## Main Work\n- Development work\n- Code implementation and improvements\n\n\
     ## Recommendations\n- Code review\n- Write tests\n- Add documentation\n\n\
     ---\nComplexity: medium\nSentiment: neutral"
        .to_string()
}

fn marker<'a>(text: &str, key: &str, values: &[&'a str]) -> Option<&'a str> {
    values
        .iter()
        .find(|v| text.contains(&format!("{}: {}", key, v)))
        .copied()
}

/// Interpret a CLI answer. The whole text is kept as the summary.
pub fn parse_response(raw: &str, topics: Vec<String>) -> AiAnalysis {
    let mut summary = raw.trim().to_string();

    let complexity = match marker(&summary, "Complexity", &["high", "low"]) {
        Some("high") => Complexity::High,
        Some("low") => Complexity::Low,
        _ => Complexity::Medium,
    };
    let sentiment = match marker(&summary, "Sentiment", &["positive", "negative"]) {
        Some("positive") => Sentiment::Positive,
        Some("negative") => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };

    if summary.chars().count() < MIN_RESPONSE_CHARS {
        summary = default_document();
    }

    AiAnalysis {
        summary,
        key_insights: Vec::new(),
        technical_details: Vec::new(),
        recommendations: Vec::new(),
        complexity,
        topics,
        sentiment,
    }
}

/// Statistics-only analysis used when the CLI is missing or fails
pub fn fallback_analysis(stats: &FallbackStats, scope: &str) -> AiAnalysis {
    let average = stats
        .average_messages_per_session
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "N/A".to_string());

    AiAnalysis {
        summary: format!(
            "This {} exchanged {} messages and produced {} code blocks.",
            scope, stats.message_count, stats.code_blocks
        ),
        key_insights: vec![
            format!("{} conversation messages exchanged", stats.message_count),
            format!("{} code blocks written", stats.code_blocks),
        ],
        technical_details: vec![
            format!("Messages: {}", stats.message_count),
            format!("Code blocks: {}", stats.code_blocks),
            format!("Average messages per session: {}", average),
        ],
        recommendations: vec![
            "Review the generated code".to_string(),
            "Document the changes".to_string(),
            "Add tests".to_string(),
        ],
        complexity: Complexity::from_message_count(stats.message_count),
        topics: stats.topics.clone(),
        sentiment: Sentiment::Neutral,
    }
}

/// Runs AI analyses through the CLI, falling back to statistics
#[derive(Clone)]
pub struct AiAnalyzer {
    cli: Option<DetectedCli>,
    timeout: Duration,
    queue: AiTaskQueue,
}

impl AiAnalyzer {
    pub fn new(cli: Option<DetectedCli>, timeout: Duration, queue: AiTaskQueue) -> Self {
        AiAnalyzer {
            cli,
            timeout,
            queue,
        }
    }

    pub fn cli(&self) -> Option<&DetectedCli> {
        self.cli.as_ref()
    }

    /// Run `prompt` through the CLI; `None` means fall back
    async fn complete(&self, prompt: &str) -> Option<String> {
        let cli = self.cli.as_ref()?;
        let _permit = match self.queue.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!("{}", e);
                return None;
            }
        };
        match cli.complete(prompt, self.timeout).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::error!("AI analysis failed, using statistics: {}", e);
                None
            }
        }
    }

    pub async fn analyze_session(
        &self,
        project_id: &str,
        session_id: &str,
        sessions: &[Session],
    ) -> AiAnalysisResult {
        let stats = analyze(sessions);
        let digest = SessionDigest::from_messages(sessions.iter().flat_map(|s| &s.messages));

        let (analysis, model) = match self.complete(&session_prompt(&digest)).await {
            Some(answer) => (parse_response(&answer, stats.topics.clone()), MODEL_CLI),
            None => {
                let fallback = FallbackStats {
                    message_count: stats.total_messages,
                    code_blocks: stats.code_blocks,
                    average_messages_per_session: None,
                    topics: stats.topics,
                };
                (fallback_analysis(&fallback, "session"), MODEL_FALLBACK)
            }
        };

        AiAnalysisResult {
            project_id: project_id.to_string(),
            session_id: Some(session_id.to_string()),
            analysis,
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            model: model.to_string(),
        }
    }

    pub async fn analyze_project(&self, project_id: &str, report: &Report) -> AiAnalysisResult {
        let s = &report.summary;
        let (analysis, model) = match self.complete(&project_prompt(report)).await {
            Some(answer) => (parse_response(&answer, s.top_topics.clone()), MODEL_CLI),
            None => {
                let fallback = FallbackStats {
                    message_count: s.total_messages,
                    code_blocks: s.total_code_blocks,
                    average_messages_per_session: Some(s.average_messages_per_session),
                    topics: s.top_topics.clone(),
                };
                (fallback_analysis(&fallback, "project"), MODEL_FALLBACK)
            }
        };

        AiAnalysisResult {
            project_id: project_id.to_string(),
            session_id: None,
            analysis,
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            model: model.to_string(),
        }
    }
}

/// Previously stored result, read fresh from disk
pub async fn load_stored(
    layout: &ReportLayout,
    project_id: &str,
    session_id: Option<&str>,
) -> Result<Option<AiAnalysisResult>> {
    let path = layout.ai_result_path(project_id, session_id);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable AI result {}: {}", path.display(), e);
                Ok(None)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn store(layout: &ReportLayout, result: &AiAnalysisResult) -> Result<PathBuf> {
    let path = layout.ai_result_path(&result.project_id, result.session_id.as_deref());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, serde_json::to_string_pretty(result)?).await?;
    tracing::info!("AI analysis saved: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_content;

    #[test]
    fn test_markers() {
        let text = format!("{}\nComplexity: high\nSentiment: positive", "x".repeat(60));
        let analysis = parse_response(&text, vec!["topic".into()]);
        assert_eq!(analysis.complexity, Complexity::High);
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.summary, text);
        assert_eq!(analysis.topics, vec!["topic"]);
    }

    #[test]
    fn test_missing_markers_default() {
        let analysis = parse_response(&"y".repeat(80), Vec::new());
        assert_eq!(analysis.complexity, Complexity::Medium);
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_short_response_replaced() {
        let analysis = parse_response("  ok, done  ", Vec::new());
        assert_eq!(analysis.summary, default_document());
    }

    #[test]
    fn test_fallback_complexity_thresholds() {
        let at = |n| {
            fallback_analysis(
                &FallbackStats {
                    message_count: n,
                    ..Default::default()
                },
                "session",
            )
            .complexity
        };
        assert_eq!(at(50), Complexity::Low);
        assert_eq!(at(51), Complexity::Medium);
        assert_eq!(at(100), Complexity::Medium);
        assert_eq!(at(101), Complexity::High);
    }

    #[test]
    fn test_serialized_shape() {
        let result = AiAnalysisResult {
            project_id: "p".into(),
            session_id: None,
            analysis: fallback_analysis(&FallbackStats::default(), "project"),
            analyzed_at: "2024-01-01T00:00:00Z".into(),
            model: MODEL_FALLBACK.into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["projectId"], "p");
        assert!(json.get("sessionId").is_none());
        assert_eq!(json["analysis"]["complexity"], "low");
        assert_eq!(json["analysis"]["sentiment"], "neutral");
        assert!(json["analysis"]["keyInsights"].is_array());
    }

    #[tokio::test]
    async fn test_without_cli_uses_fallback() {
        let analyzer = AiAnalyzer::new(None, Duration::from_secs(1), AiTaskQueue::new(1));
        let parsed = parse_content(r#"{"role":"user","content":"deploy the service"}"#, None);
        let result = analyzer.analyze_session("p", "s.jsonl", &parsed.sessions).await;
        assert_eq!(result.model, MODEL_FALLBACK);
        assert_eq!(result.session_id.as_deref(), Some("s.jsonl"));
        assert_eq!(result.analysis.topics, vec!["deploy", "service"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_answer_is_used() {
        // `cat` echoes the prompt, which is longer than the minimum response
        let cli = DetectedCli::custom(PathBuf::from("cat"), Vec::new());
        let analyzer = AiAnalyzer::new(Some(cli), Duration::from_secs(5), AiTaskQueue::new(1));
        let report = crate::report::ReportBuilder::new("/p", 0).build();
        let result = analyzer.analyze_project("p", &report).await;
        assert_eq!(result.model, MODEL_CLI);
        assert!(result.analysis.summary.contains("Project statistics"));
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ReportLayout::new(dir.path().to_path_buf());
        assert!(load_stored(&layout, "p", Some("a/b.jsonl")).await.unwrap().is_none());

        let result = AiAnalysisResult {
            project_id: "p".into(),
            session_id: Some("a/b.jsonl".into()),
            analysis: parse_response(&"z".repeat(60), Vec::new()),
            analyzed_at: "2024-01-01T00:00:00Z".into(),
            model: MODEL_CLI.into(),
        };
        let path = store(&layout, &result).await.unwrap();
        assert!(path.ends_with("p/ai-analysis-p-a__b.json"));

        let loaded = load_stored(&layout, "p", Some("a/b.jsonl")).await.unwrap();
        assert_eq!(loaded, Some(result));
        assert!(load_stored(&layout, "p", None).await.unwrap().is_none());
    }
}
