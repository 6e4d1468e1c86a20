//! Prompt construction for AI analysis

use crate::parser::{Message, Role};
use crate::report::Report;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Characters of the first user request quoted in a prompt
const REQUEST_PREVIEW: usize = 100;
/// Per-file reports included in a project prompt
const PROJECT_SESSIONS: usize = 5;

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(\w*)\n((?s:.*?))```").expect("code block regex"))
}

fn file_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\w\-/]+\.(?:tsx|ts|jsx|js|json|md|css|html|py|java|go|rs|toml)\b")
            .expect("file mention regex")
    })
}

/// What kind of code a fenced block most likely holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Implementation,
    Testing,
    Types,
    Configuration,
    Command,
}

fn classify(lang: &str, code: &str) -> CodePurpose {
    if code.contains("test") || code.contains("describe") {
        CodePurpose::Testing
    } else if code.contains("interface") || code.contains("type") {
        CodePurpose::Types
    } else if lang == "json" || lang == "toml" || lang == "yaml" {
        CodePurpose::Configuration
    } else if matches!(lang, "bash" | "sh" | "shell" | "zsh") {
        CodePurpose::Command
    } else {
        CodePurpose::Implementation
    }
}

/// Statistics derived from a session's messages for the session prompt
#[derive(Debug, Default)]
pub struct SessionDigest {
    pub message_count: usize,
    /// `(language, purpose)` per fenced block, `plain` when untagged
    pub code_blocks: Vec<(String, CodePurpose)>,
    /// Fence languages in first-seen order
    pub technologies: Vec<String>,
    /// `(file, mentions)`, most mentioned first
    pub files: Vec<(String, usize)>,
    pub first_request: Option<String>,
}

impl SessionDigest {
    pub fn from_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Self {
        let mut digest = SessionDigest::default();
        let mut file_counts: HashMap<String, usize> = HashMap::new();
        let mut file_order: Vec<String> = Vec::new();

        for message in messages {
            digest.message_count += 1;
            let content = &message.content;

            if message.role == Role::User && digest.first_request.is_none() && !content.is_empty() {
                digest.first_request = Some(content.chars().take(REQUEST_PREVIEW).collect());
            }

            for cap in code_block_re().captures_iter(content) {
                let lang = match &cap[1] {
                    "" => "plain".to_string(),
                    l => l.to_lowercase(),
                };
                let purpose = classify(&lang, &cap[2]);
                if !digest.technologies.contains(&lang) {
                    digest.technologies.push(lang.clone());
                }
                digest.code_blocks.push((lang, purpose));
            }

            for m in file_mention_re().find_iter(content) {
                let name = m.as_str().to_string();
                let count = file_counts.entry(name.clone()).or_insert(0);
                if *count == 0 {
                    file_order.push(name);
                }
                *count += 1;
            }
        }

        let mut files: Vec<(String, usize)> = file_order
            .into_iter()
            .map(|f| {
                let n = file_counts.get(&f).copied().unwrap_or(0);
                (f, n)
            })
            .collect();
        files.sort_by(|a, b| b.1.cmp(&a.1));
        digest.files = files;
        digest
    }

    fn count_purpose(&self, purpose: CodePurpose) -> usize {
        self.code_blocks.iter().filter(|(_, p)| *p == purpose).count()
    }
}

/// Prompt asking for a Markdown report on one session
pub fn session_prompt(digest: &SessionDigest) -> String {
    if digest.message_count == 0 {
        return "The session is empty; there is nothing to analyze.".to_string();
    }

    let technologies = if digest.technologies.is_empty() {
        "unknown".to_string()
    } else {
        digest
            .technologies
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let top_files = if digest.files.is_empty() {
        "none".to_string()
    } else {
        digest
            .files
            .iter()
            .take(3)
            .map(|(f, n)| format!("{} ({} mentions)", f, n))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"Analyze the following Claude Code session and write a Markdown report.

Session statistics:
- Messages: {messages}
- Code blocks: {blocks} ({implementation} implementation, {testing} testing, {commands} commands)
- Files mentioned: {file_count}
- Tech stack: {technologies}

First user request:
{request}

Most mentioned files:
{top_files}

Respond with a Markdown document using this layout:

# Session Analysis Report

## Main Work
## Implementation
## Technical Details
## Recommendations
## Summary

---
Complexity: <high|medium|low>
Sentiment: <positive|neutral|negative>"#,
        messages = digest.message_count,
        blocks = digest.code_blocks.len(),
        implementation = digest.count_purpose(CodePurpose::Implementation),
        testing = digest.count_purpose(CodePurpose::Testing),
        commands = digest.count_purpose(CodePurpose::Command),
        file_count = digest.files.len(),
        technologies = technologies,
        request = digest.first_request.as_deref().unwrap_or("(no request)"),
        top_files = top_files,
    )
}

/// Prompt asking for an overview of a whole project
pub fn project_prompt(report: &Report) -> String {
    let s = &report.summary;
    let sessions: Vec<_> = report.sessions.iter().take(PROJECT_SESSIONS).collect();
    let sessions_json =
        serde_json::to_string_pretty(&sessions).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Analyze the Claude Code conversation sessions of this project.

Project statistics:
- Sessions: {sessions}
- Messages: {messages}
- Code blocks: {blocks}
- Period: {start} ~ {end}
- Top topics: {topics}

Include:
1. An overall summary (2-3 sentences)
2. Three key insights
3. Three technical details
4. Three recommendations
5. Five main topics

End with these two lines:
Complexity: <high|medium|low>
Sentiment: <positive|neutral|negative>

Session data:
{sessions_json}"#,
        sessions = s.total_sessions,
        messages = s.total_messages,
        blocks = s.total_code_blocks,
        start = s.date_range.start.as_deref().unwrap_or("?"),
        end = s.date_range.end.as_deref().unwrap_or("?"),
        topics = s.top_topics.join(", "),
        sessions_json = sessions_json,
    )
}
