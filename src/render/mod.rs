//! Document rendering: Markdown to HTML, HTML to PDF via a headless browser

mod pdf;

pub use pdf::PdfRenderer;

use regex::Regex;
use std::sync::OnceLock;

/// Stylesheet embedded in every rendered document
const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }
h2 { color: #34495e; margin-top: 30px; border-bottom: 1px solid #ecf0f1; padding-bottom: 5px; }
h3 { color: #7f8c8d; margin-top: 20px; }
pre { background: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }
code { background: #f4f4f4; padding: 2px 5px; border-radius: 3px; font-family: Consolas, Monaco, monospace; }
li { margin: 5px 0; }
a { color: #3498db; }
"#;

fn rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?s)```[^\n]*\n?(.*?)```", "<pre><code>$1</code></pre>"),
            (r"(?m)^### (.*)$", "<h3>$1</h3>"),
            (r"(?m)^## (.*)$", "<h2>$1</h2>"),
            (r"(?m)^# (.*)$", "<h1>$1</h1>"),
            (r"\*\*(.+?)\*\*", "<strong>$1</strong>"),
            (r"`([^`\n]+?)`", "<code>$1</code>"),
            (r"(?m)^[*-] (.+)$", "<li>$1</li>"),
            (r"(?m)^\d+\. (.+)$", "<li>$1</li>"),
            (r"\[([^\]]+?)\]\(([^)]+?)\)", r#"<a href="$2">$1</a>"#),
            (r"\n\n+", "</p>\n<p>"),
        ]
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("markdown rule is a valid regex"),
                *replacement,
            )
        })
        .collect()
    })
}

/// Escape the characters HTML would interpret
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert the Markdown subset used by reports into an HTML fragment.
///
/// Input is escaped first, so raw HTML in topics or paths is shown verbatim.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = escape_html(&markdown.replace("\r\n", "\n"));
    for (regex, replacement) in rules() {
        html = regex.replace_all(&html, *replacement).into_owned();
    }
    format!("<p>{}</p>", html.trim())
}

/// Wrap a fragment in a complete, styled HTML document
pub fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}
