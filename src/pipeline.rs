use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::drive::{self, DriveClient};
use crate::parser::{self, ParseError, ParsedFields};
use crate::record::{MergeMode, ParsedRecord, SectionKey};
use crate::slack;
use crate::team::TeamDirectory;
use crate::wiki::{self, WikiRepo};

/// Full run: fetch → parse → upload → merge → publish, strictly in ascending
/// timestamp order. Upload failures degrade per record; a publish failure
/// aborts with nothing committed.
pub async fn run(cfg: &Config, publish: bool) -> Result<()> {
    let team = TeamDirectory::load(&cfg.team_file)?;

    let mut comments =
        slack::fetch_thread_comments(&cfg.slack_bot_token, &cfg.channel_id, &cfg.thread_ts)
            .await?;
    if comments.is_empty() {
        info!("Thread {} has no messages, nothing to do", cfg.thread_ts);
        return Ok(());
    }
    // The first message is the thread body itself, not a devlog entry
    comments.remove(0);
    if comments.is_empty() {
        info!("Thread {} has no replies, nothing to do", cfg.thread_ts);
        return Ok(());
    }
    info!("Processing {} comments", comments.len());

    let drive = DriveClient::new(&cfg.drive_token);
    let mut entries: Vec<(ParsedRecord, SectionKey)> = Vec::new();

    for comment in &comments {
        let fields = match parser::parse_body(&comment.body) {
            Ok(fields) => fields,
            Err(ParseError::MalformedInput) => {
                // Attachment-only comments still carry artifacts, so keep the
                // record alive with full defaults
                warn!("Comment {} has no parsable text, applying defaults", comment.id);
                ParsedFields::default()
            }
        };

        let fallback_identity = team.name(&comment.author_id);
        let mut record = ParsedRecord::resolve(fields, comment, &fallback_identity);
        let key = SectionKey::new(&record, &team.initials(&comment.author_id));

        match drive::upload_record(
            &drive,
            &cfg.slack_bot_token,
            &cfg.drive_folder_id,
            &cfg.sprint_no,
            &record,
            &key,
        )
        .await
        {
            Ok(link) => record.share_link = Some(link),
            Err(e) => warn!("Upload failed for comment {}: {}", comment.id, e),
        }

        entries.push((record, key));
    }

    // Merge in timestamp order: the first record overwrites its existing
    // section so reruns update the latest entry instead of duplicating it;
    // everything after appends.
    let repo = WikiRepo::clone_fresh(cfg)?;
    let mut page = repo.read_page(&cfg.wiki_page_name)?;
    for (i, (record, key)) in entries.iter().enumerate() {
        let mode = if i == 0 { MergeMode::Overwrite } else { MergeMode::Append };
        let section = wiki::render_section(record, key);
        page = wiki::apply_section(&page, key, &section, mode);
    }
    repo.write_page(&cfg.wiki_page_name, &page)?;

    if publish {
        repo.commit_and_push("Update devlogs")?;
        info!("Wiki updated");
    } else {
        info!("Publish skipped, updated page left in {}", cfg.work_dir.display());
    }

    Ok(())
}
