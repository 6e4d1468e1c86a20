//! Session builder
//!
//! Accumulates decoded messages into a session. A whole file (or string) is
//! one session: there is no splitting on gaps or markers.

use super::decoder::{decode_line, LineRecord};
use super::types::{Message, ParseResult, ParseStats, Session};
use crate::error::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::SplitStream, StreamExt};

/// Characters of a malformed line quoted in the warning
const PREVIEW_CHARS: usize = 50;

/// In-progress session for a single parse call
pub struct SessionBuilder {
    id: String,
    created_at: String,
    messages: Vec<Message>,
    stats: ParseStats,
    errors: Vec<String>,
}

impl SessionBuilder {
    /// Builder with a synthetic `session-<millis>` id
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self::with_id(format!("session-{}", now.timestamp_millis()))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        SessionBuilder {
            id: id.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            messages: Vec::new(),
            stats: ParseStats::default(),
            errors: Vec::new(),
        }
    }

    /// Feed one physical line
    pub fn push_line(&mut self, line: &str) {
        self.stats.lines += 1;

        match decode_line(line) {
            LineRecord::Blank => self.stats.blank_lines += 1,
            LineRecord::Ignored => self.stats.ignored_lines += 1,
            LineRecord::Malformed(err) => {
                self.stats.malformed_lines += 1;
                let preview: String = line.chars().take(PREVIEW_CHARS).collect();
                tracing::warn!("Failed to parse line {}: {}...", self.stats.lines, preview);
                self.errors
                    .push(format!("line {}: {}", self.stats.lines, err));
            }
            LineRecord::Message(message) => {
                self.stats.messages += 1;
                self.messages.push(message);
            }
        }
    }

    /// Close the stream. Emits a session only if it holds at least one message.
    pub fn finish(self) -> ParseResult {
        let sessions = if self.messages.is_empty() {
            Vec::new()
        } else {
            vec![Session {
                id: self.id,
                messages: self.messages,
                created_at: self.created_at,
            }]
        };

        ParseResult {
            sessions,
            stats: self.stats,
            errors: self.errors,
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream a JSONL file line by line without loading it whole.
///
/// Fails only when the file cannot be opened or read; bad lines are skipped.
/// Invalid UTF-8 is replaced with U+FFFD, so a bad byte costs one line at most.
pub async fn parse_file(path: &Path, session_id: Option<String>) -> Result<ParseResult> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = SplitStream::new(BufReader::new(file).split(b'\n'));
    let mut builder = session_id.map_or_else(SessionBuilder::new, SessionBuilder::with_id);

    while let Some(line) = lines.next().await {
        let line = line?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line);
        builder.push_line(&String::from_utf8_lossy(line));
    }

    let result = builder.finish();
    tracing::debug!(
        "Parsed {}: {} messages, {} malformed of {} lines",
        path.display(),
        result.stats.messages,
        result.stats.malformed_lines,
        result.stats.lines
    );
    Ok(result)
}

/// Parse content that is already in memory
pub fn parse_content(content: &str, session_id: Option<String>) -> ParseResult {
    let mut builder = session_id.map_or_else(SessionBuilder::new, SessionBuilder::with_id);
    for line in content.lines() {
        builder.push_line(line);
    }
    builder.finish()
}
