//! Statistics aggregation over parsed sessions
//!
//! Pure and infallible: counts roles, code fences, timestamp extremes and
//! user-message keywords.

pub mod topics;

pub use topics::{keywords, TopicTable, MAX_TOPICS};

use crate::parser::{Role, Session};
use serde::{Deserialize, Serialize};

const CODE_FENCE: &str = "```";

/// Aggregated counts for a set of sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub session_count: usize,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub average_messages_per_session: f64,
    /// Up to ten keywords, most frequent first
    pub topics: Vec<String>,
    pub code_blocks: usize,
    pub timestamps: Timestamps,
}

/// Lexicographic extremes of message timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub first: Option<String>,
    pub last: Option<String>,
}

impl Timestamps {
    /// Widen the range to include `ts` (string comparison, not date parsing)
    pub fn observe(&mut self, ts: &str) {
        if self.first.as_deref().map_or(true, |first| ts < first) {
            self.first = Some(ts.to_string());
        }
        if self.last.as_deref().map_or(true, |last| ts > last) {
            self.last = Some(ts.to_string());
        }
    }
}

/// Analyze sessions into an [`AnalysisResult`]
pub fn analyze(sessions: &[Session]) -> AnalysisResult {
    analyze_with_topics(sessions).0
}

/// Like [`analyze`], also returning the full keyword table for later roll-up
pub fn analyze_with_topics(sessions: &[Session]) -> (AnalysisResult, TopicTable) {
    let mut result = AnalysisResult {
        session_count: sessions.len(),
        ..Default::default()
    };
    let mut table = TopicTable::new();

    for session in sessions {
        result.total_messages += session.messages.len();

        for message in &session.messages {
            match message.role {
                Role::User => {
                    result.user_messages += 1;
                    table.add_text(&message.content);
                }
                Role::Assistant => result.assistant_messages += 1,
                Role::System | Role::Other(_) => {}
            }

            result.code_blocks += count_code_blocks(&message.content);

            if let Some(ts) = &message.timestamp {
                result.timestamps.observe(ts);
            }
        }
    }

    result.average_messages_per_session = average(result.total_messages, result.session_count);
    result.topics = table.top(MAX_TOPICS);

    (result, table)
}

/// Fenced regions in one message; an unmatched trailing fence is dropped
pub fn count_code_blocks(content: &str) -> usize {
    content.matches(CODE_FENCE).count() / 2
}

/// `total / count`, or 0 when there is nothing to divide by
pub fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_content, Message};

    fn msg(role: Role, content: &str, ts: Option<&str>) -> Message {
        Message {
            role,
            content: content.to_string(),
            timestamp: ts.map(str::to_string),
        }
    }

    fn session(messages: Vec<Message>) -> Session {
        Session {
            id: "s".to_string(),
            messages,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_empty_collection() {
        let result = analyze(&[]);
        assert_eq!(result, AnalysisResult::default());
        assert_eq!(result.average_messages_per_session, 0.0);
        assert!(result.topics.is_empty());
        assert!(result.timestamps.first.is_none());
        assert!(result.timestamps.last.is_none());
    }

    #[test]
    fn test_role_buckets_cover_total() {
        let s = session(vec![
            msg(Role::User, "a", None),
            msg(Role::Assistant, "b", None),
            msg(Role::System, "c", None),
            msg(Role::Other("tool".into()), "d", None),
            msg(Role::User, "e", None),
        ]);
        let r = analyze(&[s]);
        let other = 2;
        assert_eq!(r.total_messages, 5);
        assert_eq!(r.user_messages + r.assistant_messages + other, r.total_messages);
        assert_eq!(r.user_messages, 2);
        assert_eq!(r.assistant_messages, 1);
    }

    #[test]
    fn test_code_block_counting() {
        assert_eq!(count_code_blocks("no fences"), 0);
        assert_eq!(count_code_blocks("```"), 0);
        assert_eq!(count_code_blocks("```rust\nfn x() {}\n```"), 1);
        assert_eq!(count_code_blocks("``` a ``` b ```"), 1);
        assert_eq!(count_code_blocks("```a``````b```"), 2);
    }

    #[test]
    fn test_average() {
        let sessions = vec![
            session(vec![msg(Role::User, "x", None)]),
            session(vec![msg(Role::User, "x", None), msg(Role::Assistant, "y", None)]),
        ];
        let r = analyze(&sessions);
        assert_eq!(r.session_count, 2);
        assert_eq!(r.average_messages_per_session, 1.5);
    }

    #[test]
    fn test_timestamps_are_compared_as_strings() {
        let s = session(vec![
            msg(Role::User, "", Some("2024-03-01T00:00:00Z")),
            msg(Role::Assistant, "", None),
            msg(Role::User, "", Some("2024-01-15T00:00:00Z")),
            msg(Role::User, "", Some("2024-12-31T00:00:00Z")),
        ]);
        let r = analyze(&[s]);
        assert_eq!(r.timestamps.first.as_deref(), Some("2024-01-15T00:00:00Z"));
        assert_eq!(r.timestamps.last.as_deref(), Some("2024-12-31T00:00:00Z"));

        // "9" sorts after "10" lexicographically
        let s = session(vec![
            msg(Role::User, "", Some("9")),
            msg(Role::User, "", Some("10")),
        ]);
        let r = analyze(&[s]);
        assert_eq!(r.timestamps.first.as_deref(), Some("10"));
        assert_eq!(r.timestamps.last.as_deref(), Some("9"));
    }

    #[test]
    fn test_topics_only_from_user_messages() {
        let s = session(vec![
            msg(Role::User, "deploy the server", None),
            msg(Role::Assistant, "assistant assistant assistant", None),
        ]);
        let r = analyze(&[s]);
        assert_eq!(r.topics, vec!["deploy", "server"]);
    }

    #[test]
    fn test_topics_capped_and_descending() {
        let text = (0..15)
            .map(|i| format!("word{:02} ", i).repeat(i + 1))
            .collect::<String>();
        let s = session(vec![msg(Role::User, &text, None)]);
        let (r, table) = analyze_with_topics(&[s]);

        assert_eq!(r.topics.len(), MAX_TOPICS);
        assert_eq!(r.topics[0], "word14");
        let counts: Vec<usize> = r.topics.iter().map(|t| table.count(t)).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(table.len(), 15);
    }

    #[test]
    fn test_scenario_a_counts() {
        let content = concat!(
            r#"{"role":"user","content":"hello world"}"#,
            "\n\n",
            r#"{"role":"assistant","content":"hi ```code``` done"}"#,
        );
        let parsed = parse_content(content, None);
        assert_eq!(parsed.sessions.len(), 1);

        let r = analyze(&parsed.sessions);
        assert_eq!(r.session_count, 1);
        assert_eq!(r.total_messages, 2);
        assert_eq!(r.user_messages, 1);
        assert_eq!(r.assistant_messages, 1);
        assert_eq!(r.code_blocks, 1);
    }

    #[test]
    fn test_scenario_d_repeated_keyword_ranks_first() {
        let s = session(vec![
            msg(Role::User, "the fix for error", None),
            msg(Role::User, "error again here", None),
        ]);
        let (r, table) = analyze_with_topics(&[s]);
        assert_eq!(r.topics[0], "error");
        assert_eq!(table.count("error"), 2);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(analyze(&[])).unwrap();
        assert_eq!(json["sessionCount"], 0);
        assert_eq!(json["averageMessagesPerSession"], 0.0);
        assert!(json["timestamps"]["first"].is_null());
    }
}
