use std::sync::LazyLock;

use regex::Regex;

// Key lines are identified by loose keyword matching: any case, optional
// leading bullet/punctuation, `:` `-` `=` or whitespace between key and value.
static DATE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s\-*•>]*(?:date|day)\b\s*[:\-=]?\s*(.*)$").unwrap()
});
static WORKER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s\-*•>]*(?:workers?|members?|who)\b\s*[:\-=]\s*(.*)$").unwrap()
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").unwrap());

/// One classified line of a comment body.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Raw value after a date keyword, e.g. "24/03/10".
    Date(String),
    /// Raw value after a worker keyword, e.g. "alice, bob".
    Workers(String),
    /// Bullet line with the marker stripped.
    Task(String),
    /// Plain prose line.
    Text(String),
    Empty,
}

pub fn classify_lines(body: &str) -> Vec<Line> {
    let mut lines = Vec::new();

    for raw in body.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            lines.push(Line::Empty);
            continue;
        }

        if let Some(caps) = DATE_LINE_RE.captures(trimmed) {
            lines.push(Line::Date(caps[1].trim().to_string()));
            continue;
        }

        if let Some(caps) = WORKER_LINE_RE.captures(trimmed) {
            lines.push(Line::Workers(caps[1].trim().to_string()));
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(trimmed) {
            lines.push(Line::Task(caps[1].trim().to_string()));
            continue;
        }

        lines.push(Line::Text(trimmed.to_string()));
    }

    lines
}

// ── Tests ──
