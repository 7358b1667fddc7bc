use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::parser::ParsedFields;

/// One comment as fetched from the thread. Immutable after fetch.
#[derive(Debug, Clone)]
pub struct RawComment {
    pub id: String,
    pub author_id: String,
    pub timestamp: DateTime<Utc>,
    pub body: String,
    pub attachment_urls: Vec<Attachment>,
}

/// A file attached to a comment. `name` is the original filename as shown in
/// the chat client; `url` requires the bot token to download.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Structured devlog entry. Built by `resolve`, mutated exactly once when the
/// uploader fills in `share_link`, then frozen.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedRecord {
    pub date: NaiveDate,
    pub workers: Vec<String>,
    pub tasks: Vec<String>,
    #[serde(skip)]
    pub raw_attachments: Vec<Attachment>,
    pub share_link: Option<String>,
}

impl ParsedRecord {
    /// Apply fallbacks: a body-declared date wins over the comment timestamp,
    /// and an empty worker list defaults to the authoring identity.
    pub fn resolve(fields: ParsedFields, comment: &RawComment, fallback_identity: &str) -> Self {
        let date = fields.date.unwrap_or_else(|| comment.timestamp.date_naive());
        let workers = if fields.workers.is_empty() {
            vec![fallback_identity.to_string()]
        } else {
            fields.workers
        };
        ParsedRecord {
            date,
            workers,
            tasks: fields.tasks,
            raw_attachments: comment.attachment_urls.clone(),
            share_link: None,
        }
    }

    /// 6-digit YYMMDD form used in folder names, file names, and headings.
    pub fn date_key(&self) -> String {
        self.date.format("%y%m%d").to_string()
    }
}

/// Composite key identifying one document section and one storage folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionKey {
    pub date: String, // YYMMDD
    pub initials: String,
}

impl SectionKey {
    pub fn new(record: &ParsedRecord, initials: &str) -> Self {
        SectionKey {
            date: record.date_key(),
            initials: initials.to_string(),
        }
    }

    /// Folder segment / heading suffix: "240310_AB".
    pub fn folder_name(&self) -> String {
        format!("{}_{}", self.date, self.initials)
    }
}

/// How a section is applied to the target document. The caller chooses the
/// mode per record; position in the run never decides implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Replace the existing section with the same key, or append if absent.
    Overwrite,
    /// Always add a new section, even if the key already exists.
    Append,
}

// ── Tests ──
