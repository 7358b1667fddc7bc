use std::path::PathBuf;

use anyhow::{Context, Result};
use git2::{build::RepoBuilder, Cred, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository, Signature};
use tracing::info;

use crate::config::Config;
use crate::record::{MergeMode, ParsedRecord, SectionKey};

// ── Merge ──

pub fn section_heading(key: &SectionKey) -> String {
    format!("## {} {}", key.date, key.initials)
}

/// Render one record as a markdown section under its `## YYMMDD initials`
/// heading.
pub fn render_section(record: &ParsedRecord, key: &SectionKey) -> String {
    let mut out = String::new();
    out.push_str(&section_heading(key));
    out.push_str("\n\n");
    out.push_str(&format!("**Workers:** {}\n", record.workers.join(", ")));

    if !record.tasks.is_empty() {
        out.push('\n');
        for task in &record.tasks {
            out.push_str(&format!("- {}\n", task));
        }
    }

    if let Some(link) = &record.share_link {
        out.push_str(&format!("\n[Artifacts]({})\n", link));
    }

    out
}

/// Apply one rendered section to the document. `Overwrite` replaces the
/// existing section with the same heading in place (appends if absent);
/// `Append` always adds a new section at the end, so same-key entries from
/// different comments coexist.
pub fn apply_section(doc: &str, key: &SectionKey, section: &str, mode: MergeMode) -> String {
    let heading = section_heading(key);

    if mode == MergeMode::Overwrite {
        if let Some(range) = find_section(doc, &heading) {
            let mut out = String::with_capacity(doc.len() + section.len());
            out.push_str(&doc[..range.0]);
            out.push_str(section.trim_end());
            out.push('\n');
            if range.1 < doc.len() {
                out.push('\n');
            }
            out.push_str(&doc[range.1..]);
            return out;
        }
    }

    let mut out = doc.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(section.trim_end());
    out.push('\n');
    out
}

/// Byte range of the first section whose heading line equals `heading`,
/// spanning up to the next `## ` heading or end of document.
fn find_section(doc: &str, heading: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    let mut start = None;

    for line in doc.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if start.is_none() {
            if trimmed == heading {
                start = Some(offset);
            }
        } else if trimmed.starts_with("## ") {
            return Some((start.unwrap(), offset));
        }
        offset += line.len();
    }

    start.map(|s| (s, doc.len()))
}

// ── Publisher ──

/// Local checkout of the wiki repository. A fresh clone per run keeps the
/// working tree in sync with the remote without merge handling.
pub struct WikiRepo {
    repo: Repository,
    path: PathBuf,
    branch: String,
    user_name: String,
    user_email: String,
    token: Option<String>,
}

impl WikiRepo {
    pub fn clone_fresh(cfg: &Config) -> Result<Self> {
        let path = cfg.work_dir.join("repo.wiki");
        if path.exists() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to clear {}", path.display()))?;
        }
        std::fs::create_dir_all(&cfg.work_dir)?;

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks(cfg.wiki_git_token.clone()));

        let repo = RepoBuilder::new()
            .branch(&cfg.wiki_branch)
            .fetch_options(fetch)
            .clone(&cfg.wiki_repo_url, &path)
            .with_context(|| format!("Failed to clone wiki repo {}", cfg.wiki_repo_url))?;
        info!("Cloned {} into {}", cfg.wiki_repo_url, path.display());

        Ok(WikiRepo {
            repo,
            path,
            branch: cfg.wiki_branch.clone(),
            user_name: cfg.git_user_name.clone(),
            user_email: cfg.git_user_email.clone(),
            token: cfg.wiki_git_token.clone(),
        })
    }

    fn page_path(&self, page_name: &str) -> PathBuf {
        self.path.join(format!("{}.md", page_name))
    }

    /// A missing page starts empty; a present page must be readable, since
    /// failing here has to abort before any section is applied.
    pub fn read_page(&self, page_name: &str) -> Result<String> {
        let path = self.page_path(page_name);
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read wiki page {}", path.display()))
    }

    pub fn write_page(&self, page_name: &str, content: &str) -> Result<()> {
        let path = self.page_path(page_name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write wiki page {}", path.display()))
    }

    /// Stage everything, commit, and push. Returns false when the tree is
    /// unchanged and there is nothing to publish.
    pub fn commit_and_push(&self, message: &str) -> Result<bool> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let head = self.repo.head()?.peel_to_commit()?;
        if head.tree_id() == tree_id {
            info!("Wiki unchanged, nothing to publish");
            return Ok(false);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let sig = Signature::now(&self.user_name, &self.user_email)?;
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&head])?;

        let mut remote = self.repo.find_remote("origin")?;
        let mut push = PushOptions::new();
        push.remote_callbacks(callbacks(self.token.clone()));
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", self.branch);
        remote
            .push(&[refspec.as_str()], Some(&mut push))
            .context("Failed to push wiki repo")?;
        info!("Pushed wiki update: {}", message);
        Ok(true)
    }
}

fn callbacks(token: Option<String>) -> RemoteCallbacks<'static> {
    let mut cb = RemoteCallbacks::new();
    cb.credentials(move |_url, username_from_url, _allowed| {
        match &token {
            Some(t) => Cred::userpass_plaintext(username_from_url.unwrap_or("git"), t),
            None => Cred::default(),
        }
    });
    cb
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::record::Attachment;

    fn record(day: u32, workers: &[&str], tasks: &[&str], link: Option<&str>) -> ParsedRecord {
        ParsedRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            workers: workers.iter().map(|s| s.to_string()).collect(),
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
            raw_attachments: Vec::<Attachment>::new(),
            share_link: link.map(str::to_string),
        }
    }

    fn key(rec: &ParsedRecord, initials: &str) -> SectionKey {
        SectionKey::new(rec, initials)
    }

    #[test]
    fn render_includes_heading_workers_tasks_link() {
        let rec = record(10, &["alice", "bob"], &["fix bug A"], Some("https://x/folder"));
        let text = render_section(&rec, &key(&rec, "AB"));
        assert!(text.starts_with("## 240310 AB\n"));
        assert!(text.contains("**Workers:** alice, bob"));
        assert!(text.contains("- fix bug A"));
        assert!(text.contains("[Artifacts](https://x/folder)"));
    }

    #[test]
    fn append_to_empty_document() {
        let rec = record(10, &["alice"], &["a"], None);
        let k = key(&rec, "AL");
        let doc = apply_section("", &k, &render_section(&rec, &k), MergeMode::Append);
        assert!(doc.starts_with("## 240310 AL"));
        assert!(doc.ends_with('\n'));
    }

    #[test]
    fn overwrite_replaces_matching_section_in_place() {
        let old = record(10, &["alice"], &["old task"], None);
        let k = key(&old, "AL");
        let later = record(11, &["bob"], &["later"], None);
        let k2 = key(&later, "BO");

        let mut doc = apply_section("", &k, &render_section(&old, &k), MergeMode::Append);
        doc = apply_section(&doc, &k2, &render_section(&later, &k2), MergeMode::Append);

        let new = record(10, &["alice"], &["new task"], None);
        let merged = apply_section(&doc, &k, &render_section(&new, &k), MergeMode::Overwrite);

        assert!(merged.contains("new task"));
        assert!(!merged.contains("old task"));
        // Replaced in place: 240310 still comes before 240311
        assert!(merged.find("## 240310 AL").unwrap() < merged.find("## 240311 BO").unwrap());
    }

    #[test]
    fn overwrite_appends_when_section_absent() {
        let rec = record(10, &["alice"], &["a"], None);
        let k = key(&rec, "AL");
        let doc = apply_section("# DevLogs\n", &k, &render_section(&rec, &k), MergeMode::Overwrite);
        assert!(doc.contains("# DevLogs"));
        assert!(doc.contains("## 240310 AL"));
    }

    #[test]
    fn append_keeps_duplicate_keys_as_separate_entries() {
        let first = record(10, &["alice"], &["morning"], None);
        let second = record(10, &["alice"], &["evening"], None);
        let k = key(&first, "AL");

        let mut doc = apply_section("", &k, &render_section(&first, &k), MergeMode::Append);
        doc = apply_section(&doc, &k, &render_section(&second, &k), MergeMode::Append);

        assert_eq!(doc.matches("## 240310 AL").count(), 2);
        assert!(doc.contains("morning"));
        assert!(doc.contains("evening"));
    }

    #[test]
    fn sections_follow_merge_order() {
        let recs = [
            record(10, &["a"], &["t1"], None),
            record(11, &["b"], &["t2"], None),
            record(12, &["c"], &["t3"], None),
        ];
        let mut doc = String::new();
        for (rec, initials) in recs.iter().zip(["A", "B", "C"]) {
            let k = key(rec, initials);
            doc = apply_section(&doc, &k, &render_section(rec, &k), MergeMode::Append);
        }
        let positions: Vec<_> = ["## 240310 A", "## 240311 B", "## 240312 C"]
            .iter()
            .map(|h| doc.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rerun_overwrites_latest_without_duplicating() {
        // First run: two records, Overwrite then Append
        let r1 = record(10, &["alice"], &["day one"], None);
        let r2 = record(11, &["bob"], &["day two"], None);
        let k1 = key(&r1, "AL");
        let k2 = key(&r2, "BO");

        let mut doc = apply_section("", &k1, &render_section(&r1, &k1), MergeMode::Overwrite);
        doc = apply_section(&doc, &k2, &render_section(&r2, &k2), MergeMode::Append);

        // A re-run over the unchanged thread reproduces the same document
        let mut rerun = apply_section("", &k1, &render_section(&r1, &k1), MergeMode::Overwrite);
        rerun = apply_section(&rerun, &k2, &render_section(&r2, &k2), MergeMode::Append);
        assert_eq!(doc, rerun);

        // New comment arrives later, replayed run overwrites the latest
        // section in place instead of duplicating it.
        let updated = apply_section(&doc, &k2, &render_section(&r2, &k2), MergeMode::Overwrite);
        assert_eq!(updated.matches("## 240311 BO").count(), 1);
        assert_eq!(updated.matches("## 240310 AL").count(), 1);
    }
}
