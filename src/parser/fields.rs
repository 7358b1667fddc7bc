use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::lines::Line;
use super::ParsedFields;

// yy/mm/dd with tolerant separators; 4-digit years also accepted.
static DATE_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,4})\s*[./-]\s*(\d{1,2})\s*[./-]\s*(\d{1,2})").unwrap());
static WORKER_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:,|/|&|\band\b)\s*").unwrap());

/// Assemble structured fields from classified lines. First date/worker line
/// wins; later duplicates are ignored. Every task or prose line becomes a
/// task, in order of appearance.
pub fn assemble(lines: &[Line]) -> ParsedFields {
    let mut fields = ParsedFields::default();

    for line in lines {
        match line {
            Line::Date(value) if fields.date.is_none() => {
                fields.date = parse_date_value(value);
            }
            Line::Workers(value) if fields.workers.is_empty() => {
                fields.workers = split_workers(value);
            }
            Line::Task(text) => fields.tasks.push(text.clone()),
            Line::Text(text) => fields.tasks.push(text.clone()),
            _ => {}
        }
    }

    fields
}

fn parse_date_value(value: &str) -> Option<NaiveDate> {
    let caps = DATE_VALUE_RE.captures(value)?;
    let mut year: i32 = caps[1].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn split_workers(value: &str) -> Vec<String> {
    WORKER_SPLIT_RE
        .split(value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──
