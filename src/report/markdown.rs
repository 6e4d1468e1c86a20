use super::{DateRange, Report};
use std::fmt::Write;

/// Render a report as a human-readable Markdown document
pub fn to_markdown(report: &Report) -> String {
    let mut md = String::new();
    let s = &report.summary;

    // Writing to a String is infallible
    let _ = writeln!(md, "# Claude Code Session Analysis Report\n");
    let _ = writeln!(md, "- **Analyzed at**: {}", report.analyzed_at);
    let _ = writeln!(md, "- **Source**: `{}`", report.source_path);
    let _ = writeln!(md, "- **Files analyzed**: {}\n", report.files_analyzed);

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "- **Total sessions**: {}", s.total_sessions);
    let _ = writeln!(md, "- **Total messages**: {}", s.total_messages);
    let _ = writeln!(md, "- **User messages**: {}", s.user_messages);
    let _ = writeln!(md, "- **Assistant messages**: {}", s.assistant_messages);
    let _ = writeln!(md, "- **Code blocks**: {}", s.total_code_blocks);
    let _ = writeln!(
        md,
        "- **Average messages per session**: {:.1}",
        s.average_messages_per_session
    );
    let _ = writeln!(md, "- **Date range**: {}\n", format_range(&s.date_range));

    let _ = writeln!(md, "### Top Topics\n");
    if s.top_topics.is_empty() {
        let _ = writeln!(md, "No topics found.");
    } else {
        for (i, topic) in s.top_topics.iter().enumerate() {
            let _ = writeln!(md, "{}. {}", i + 1, topic);
        }
    }
    md.push('\n');

    if !report.sessions.is_empty() {
        let _ = writeln!(md, "## Sessions\n");
        for session in &report.sessions {
            let _ = writeln!(md, "### {}\n", session.id);
            let _ = writeln!(
                md,
                "- **Messages**: {} ({} user, {} assistant)",
                session.total_messages, session.user_messages, session.assistant_messages
            );
            let _ = writeln!(md, "- **Code blocks**: {}", session.code_blocks);
            let _ = writeln!(md, "- **Date range**: {}", format_range(&session.date_range));
            if !session.topics.is_empty() {
                let _ = writeln!(md, "- **Topics**: {}", session.topics.join(", "));
            }
            md.push('\n');
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(md, "## Failed Files\n");
        for failure in &report.failures {
            let _ = writeln!(md, "- `{}`: {}", failure.file, failure.error);
        }
        md.push('\n');
    }

    let _ = writeln!(md, "---\n");
    let _ = writeln!(
        md,
        "Generated by claude-report {} on {}",
        report.metadata.analyzer_version, report.metadata.platform
    );

    md
}

fn format_range(range: &DateRange) -> String {
    match (&range.start, &range.end) {
        (Some(start), Some(end)) => format!("{} ~ {}", start, end),
        (Some(only), None) | (None, Some(only)) => only.clone(),
        (None, None) => "n/a".to_string(),
    }
}
