use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::record::{ParsedRecord, SectionKey};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileLink {
    #[serde(rename = "webViewLink")]
    web_view_link: String,
}

pub struct DriveClient {
    http: reqwest::Client,
    token: String,
}

impl DriveClient {
    pub fn new(token: &str) -> Self {
        DriveClient {
            http: reqwest::Client::new(),
            token: token.to_string(),
        }
    }

    /// Walk `segments` under `root`, creating each missing folder, and return
    /// the id of the innermost one.
    pub async fn ensure_folder_path(&self, root: &str, segments: &[String]) -> Result<String> {
        let mut parent = root.to_string();
        for name in segments {
            parent = match self.find_child_folder(&parent, name).await? {
                Some(id) => id,
                None => self.create_folder(&parent, name).await?,
            };
        }
        Ok(parent)
    }

    async fn find_child_folder(&self, parent: &str, name: &str) -> Result<Option<String>> {
        let query = format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            name.replace('\'', "\\'"),
            parent,
            FOLDER_MIME,
        );
        let list: FileList = self
            .http
            .get(FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode folder listing")?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String> {
        let meta: FileMeta = self
            .http
            .post(FILES_URL)
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to create folder {}", name))?;
        Ok(meta.id)
    }

    /// Two calls: create the file entry, then upload its content.
    pub async fn upload_bytes(
        &self,
        folder: &str,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let meta: FileMeta = self
            .http
            .post(FILES_URL)
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({ "name": name, "parents": [folder] }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to create file entry {}", name))?;

        self.http
            .patch(format!("{}/{}", UPLOAD_URL, meta.id))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media"), ("supportsAllDrives", "true")])
            .header("Content-Type", mime)
            .body(bytes)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Failed to upload content of {}", name))?;

        Ok(meta.id)
    }

    /// Grant anyone/reader on the folder and return its webViewLink.
    pub async fn share_folder(&self, folder_id: &str) -> Result<String> {
        self.http
            .post(format!("{}/{}/permissions", FILES_URL, folder_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?
            .error_for_status()
            .context("Failed to share folder")?;

        let link: FileLink = self
            .http
            .get(format!("{}/{}", FILES_URL, folder_id))
            .bearer_auth(&self.token)
            .query(&[("fields", "webViewLink"), ("supportsAllDrives", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to fetch folder link")?;
        Ok(link.web_view_link)
    }
}

/// Upload one record's artifacts into `Sprint{n}/DevLogs/{date}_{initials}`:
/// the structured data as JSON, then each image. Attachment failures are
/// logged and skipped; the share link is returned for whatever made it up.
pub async fn upload_record(
    drive: &DriveClient,
    slack_token: &str,
    root_folder: &str,
    sprint_no: &str,
    record: &ParsedRecord,
    key: &SectionKey,
) -> Result<String> {
    let segments = vec![
        format!("Sprint{}", sprint_no),
        "DevLogs".to_string(),
        key.folder_name(),
    ];
    let folder = drive.ensure_folder_path(root_folder, &segments).await?;

    let json_name = format!("{}_data.json", key.folder_name());
    let json_bytes = serde_json::to_vec_pretty(record)?;
    drive
        .upload_bytes(&folder, &json_name, "application/json", json_bytes)
        .await?;
    info!("Uploaded {} to {}", json_name, segments.join("/"));

    let http = reqwest::Client::new();
    for attachment in &record.raw_attachments {
        let name = randomized_name(&attachment.name);
        let Some(mime) = mime_from_name(&name) else {
            warn!("Unsupported file type: {}", attachment.name);
            continue;
        };

        let bytes = match download_attachment(&http, slack_token, &attachment.url).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to download {}: {}", attachment.url, e);
                continue;
            }
        };

        match drive.upload_bytes(&folder, &name, mime, bytes).await {
            Ok(_) => info!("Uploaded {} to {}", name, segments.join("/")),
            Err(e) => warn!("Failed to upload {}: {}", name, e),
        }
    }

    drive.share_folder(&folder).await
}

async fn download_attachment(
    http: &reqwest::Client,
    token: &str,
    url: &str,
) -> Result<Vec<u8>> {
    let bytes = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(bytes.to_vec())
}

/// "photo.png" → "photo_a3f29c.png". The random infix keeps repeated uploads
/// of the same filename from colliding in the shared folder.
fn randomized_name(name: &str) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i..]),
        None => (name, ""),
    };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}{}", stem, &suffix[..6], ext)
}

fn mime_from_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "json" => Some("application/json"),
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomized_name_keeps_stem_and_ext() {
        let name = randomized_name("screenshot.png");
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "screenshot_".len() + 6 + ".png".len());
    }

    #[test]
    fn randomized_name_without_extension() {
        let name = randomized_name("notes");
        assert!(name.starts_with("notes_"));
        assert_eq!(name.len(), "notes_".len() + 6);
    }

    #[test]
    fn randomized_names_differ() {
        assert_ne!(randomized_name("a.png"), randomized_name("a.png"));
    }

    #[test]
    fn mime_lookup() {
        assert_eq!(mime_from_name("x.PNG"), Some("image/png"));
        assert_eq!(mime_from_name("x.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_from_name("x.exe"), None);
        assert_eq!(mime_from_name("noext"), None);
    }
}
