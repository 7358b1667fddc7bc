use std::path::PathBuf;

use anyhow::{Context, Result};

/// Everything the pipeline needs from the environment, gathered once at
/// startup so a missing variable fails before any network call.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack_bot_token: String,
    pub channel_id: String,
    pub thread_ts: String,
    pub drive_token: String,
    pub drive_folder_id: String,
    pub sprint_no: String,
    pub wiki_repo_url: String,
    pub wiki_page_name: String,
    pub wiki_branch: String,
    /// Optional token for https pushes; ssh URLs go through the default
    /// credential chain instead.
    pub wiki_git_token: Option<String>,
    pub git_user_name: String,
    pub git_user_email: String,
    pub team_file: PathBuf,
    pub work_dir: PathBuf,
}

fn var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} environment variable must be set", name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            slack_bot_token: var("SLACK_BOT_TOKEN")?,
            channel_id: var("SLACK_CHANNEL_ID")?,
            thread_ts: var("SLACK_THREAD_TS")?,
            drive_token: var("DRIVE_ACCESS_TOKEN")?,
            drive_folder_id: var("DRIVE_FOLDER_ID")?,
            sprint_no: var("TEAM_SPRINT_NO")?,
            wiki_repo_url: var("WIKI_REPO_URL")?,
            wiki_page_name: var("WIKI_PAGE_NAME")?,
            wiki_branch: var_or("WIKI_BRANCH", "master"),
            wiki_git_token: std::env::var("WIKI_GIT_TOKEN").ok(),
            git_user_name: var_or("GIT_USER_NAME", "devlog-sync"),
            git_user_email: var_or("GIT_USER_EMAIL", "devlog-sync@localhost"),
            team_file: PathBuf::from(var_or("TEAM_FILE", "team.json")),
            work_dir: PathBuf::from(var_or("WORK_DIR", "tmp")),
        })
    }

    /// Subset needed by the read-only `fetch` command, which never touches
    /// Drive or the wiki.
    pub fn slack_only() -> Result<(String, String, String)> {
        Ok((var("SLACK_BOT_TOKEN")?, var("SLACK_CHANNEL_ID")?, var("SLACK_THREAD_TS")?))
    }
}
