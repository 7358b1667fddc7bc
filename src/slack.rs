use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::record::{Attachment, RawComment};

const REPLIES_URL: &str = "https://slack.com/api/conversations.replies";

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    ts: String,
    user: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    name: Option<String>,
    url_private: Option<String>,
}

/// Fetch every comment in a thread, following cursor pagination, sorted by
/// send time ascending. The thread root message is included; the caller
/// decides whether to drop it.
pub async fn fetch_thread_comments(
    token: &str,
    channel: &str,
    thread_ts: &str,
) -> Result<Vec<RawComment>> {
    let client = reqwest::Client::new();
    let mut comments = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let mut query = vec![
            ("channel", channel.to_string()),
            ("ts", thread_ts.to_string()),
            ("limit", "200".to_string()),
        ];
        if let Some(c) = &cursor {
            query.push(("cursor", c.clone()));
        }

        let response: RepliesResponse = client
            .get(REPLIES_URL)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?
            .json()
            .await
            .context("Failed to decode conversations.replies response")?;

        if !response.ok {
            bail!(
                "conversations.replies failed: {}",
                response.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        comments.extend(parse_messages(response.messages));

        cursor = response
            .response_metadata
            .and_then(|m| m.next_cursor)
            .filter(|c| !c.is_empty());
        if cursor.is_none() {
            break;
        }
    }

    comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    info!(
        "Fetched {} comments for thread {} in channel {}",
        comments.len(),
        thread_ts,
        channel
    );
    Ok(comments)
}

fn parse_messages(messages: Vec<Message>) -> Vec<RawComment> {
    messages
        .into_iter()
        .filter_map(|m| {
            let timestamp = ts_to_datetime(&m.ts)?;
            let attachment_urls = m
                .files
                .into_iter()
                .filter_map(|f| {
                    let url = f.url_private?;
                    let name = f
                        .name
                        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or("file").to_string());
                    Some(Attachment { name, url })
                })
                .collect();
            Some(RawComment {
                id: m.ts.clone(),
                author_id: m.user.unwrap_or_default(),
                timestamp,
                body: m.text,
                attachment_urls,
            })
        })
        .collect()
}

/// Slack ts strings look like "1714521600.000100": epoch seconds, then a
/// microsecond suffix that also disambiguates ordering.
fn ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = frac.parse().unwrap_or(0);
    DateTime::from_timestamp(secs, micros * 1_000)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_parsing() {
        let dt = ts_to_datetime("1714521600.000100").unwrap();
        assert_eq!(dt.timestamp(), 1714521600);
        assert_eq!(dt.timestamp_subsec_micros(), 100);
        assert!(ts_to_datetime("garbage").is_none());
    }

    #[test]
    fn fixture_thread() {
        let raw = std::fs::read_to_string("tests/fixtures/thread.json").unwrap();
        let response: RepliesResponse = serde_json::from_str(&raw).unwrap();
        assert!(response.ok);

        let mut comments = parse_messages(response.messages);
        comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        assert_eq!(comments.len(), 3);
        // Ascending order even though the fixture lists replies out of order
        assert!(comments.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(comments[0].author_id, "U01");
        assert_eq!(comments[1].attachment_urls.len(), 1);
        assert_eq!(comments[1].attachment_urls[0].name, "screenshot.png");
    }

    #[test]
    fn message_without_files_or_user() {
        let parsed = parse_messages(vec![Message {
            ts: "1714521600.000100".into(),
            user: None,
            text: "hello".into(),
            files: vec![],
        }]);
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].attachment_urls.is_empty());
    }
}
