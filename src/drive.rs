//! Storage API: folder creation, server-side copy and chunked download

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::api::{check, Session};
use crate::error::{Error, Result};

pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Bytes requested per download chunk
///
/// Small enough for one chunk to finish inside the HTTP client's timeout.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A server-side copy: the new file's ID and the title it was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub id: String,
    pub title: String,
}

/// Progress after one downloaded chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u64> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(self.downloaded.min(total) * 100 / total),
            None => None,
        }
    }
}

/// Remote storage operations
pub trait DriveApi {
    /// Create a folder, returning its ID
    fn create_folder(&self, name: &str) -> Result<String>;

    /// Copy `file_id` into `parent_id` under `title`
    fn copy(&self, file_id: &str, title: &str, parent_id: &str) -> Result<CopyRecord>;

    /// Stream a file's content into `sink`, reporting after every chunk
    fn download(
        &self,
        file_id: &str,
        sink: &mut dyn Write,
        progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct FileResource {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// HTTP client for the Drive API
#[derive(Debug, Clone)]
pub struct DriveClient {
    session: Session,
    base_url: String,
    chunk_size: u64,
}

impl DriveClient {
    pub fn new(session: Session) -> Self {
        Self::with_base_url(session, DEFAULT_DRIVE_BASE_URL)
    }

    pub fn with_base_url(session: Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }
}

impl DriveApi for DriveClient {
    fn create_folder(&self, name: &str) -> Result<String> {
        let response = self
            .session
            .post(&self.files_url())
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()?;
        let folder: FileResource = check(response)?.json()?;
        Ok(folder.id)
    }

    fn copy(&self, file_id: &str, title: &str, parent_id: &str) -> Result<CopyRecord> {
        let url = format!("{}/{}/copy", self.files_url(), file_id);
        let response = self
            .session
            .post(&url)
            .json(&json!({ "name": title, "parents": [parent_id] }))
            .send()?;
        let copied: FileResource = check(response)?.json()?;

        Ok(CopyRecord {
            title: copied.name.unwrap_or_else(|| title.to_string()),
            id: copied.id,
        })
    }

    fn download(
        &self,
        file_id: &str,
        sink: &mut dyn Write,
        progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<u64> {
        let url = format!("{}/{}", self.files_url(), file_id);
        let mut downloaded: u64 = 0;

        loop {
            let range = range_header(downloaded, self.chunk_size);
            let response = self
                .session
                .get(&url)
                .query(&[("alt", "media")])
                .header(RANGE, range)
                .send()?;

            let status = response.status();
            let content_range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            // An empty file cannot satisfy any range
            if status == StatusCode::RANGE_NOT_SATISFIABLE && content_range.as_deref() == Some("bytes */0") {
                progress(DownloadProgress { downloaded: 0, total: Some(0) });
                return Ok(0);
            }

            let response = check(response)?;
            let chunk = response.bytes()?;
            sink.write_all(&chunk)?;
            downloaded += chunk.len() as u64;

            let total = if status == StatusCode::PARTIAL_CONTENT {
                content_range.as_deref().and_then(parse_total_size)
            } else {
                Some(downloaded)
            };
            progress(DownloadProgress { downloaded, total });
            debug!(file_id, downloaded, ?total, "Downloaded chunk");

            match total {
                Some(total) if downloaded >= total => return Ok(downloaded),
                _ if chunk.is_empty() => {
                    return Err(Error::General(format!(
                        "Download of {} stalled at {} bytes",
                        file_id, downloaded
                    )))
                }
                _ => {}
            }
        }
    }
}

/// `Range` value for the chunk starting at `start`, clamped to `u64::MAX`
fn range_header(start: u64, chunk_size: u64) -> String {
    let end = start.saturating_add(chunk_size.max(1) - 1);
    format!("bytes={}-{}", start, end)
}

/// Total size from `Content-Range: bytes a-b/total`
fn parse_total_size(content_range: &str) -> Option<u64> {
    content_range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

/// Create a storage folder
///
/// API errors are logged and yield `None`.
pub fn create_folder(api: &impl DriveApi, name: &str) -> Option<String> {
    match api.create_folder(name) {
        Ok(id) => {
            println!("Folder ID: \"{}\".", id);
            info!(folder_id = %id, name, "Created folder");
            Some(id)
        }
        Err(e) => {
            error!(name, "An error occurred while creating the folder: {}", e);
            None
        }
    }
}

/// Copy a remote file into a folder under a new title
///
/// API errors are logged and yield `None`.
pub fn copy_file(api: &impl DriveApi, file_id: &str, new_title: &str, folder_id: &str) -> Option<CopyRecord> {
    match api.copy(file_id, new_title, folder_id) {
        Ok(copy) => {
            println!("File copied successfully, new file ID: {}", copy.id);
            Some(copy)
        }
        Err(e) => {
            error!(file_id, folder_id, "An error occurred while copying: {}", e);
            None
        }
    }
}

/// Download a remote file to `local_path`
///
/// Failures propagate; an interrupted transfer leaves the partial file behind.
pub fn get_file(api: &impl DriveApi, file_id: &str, local_path: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(local_path)?);
    let name = local_path.display().to_string();

    let bytes = api.download(file_id, &mut writer, &mut |p: DownloadProgress| match p.percent() {
        Some(percent) => println!("Downloading {} {}%.", name, percent),
        None => println!("Downloading {}.", name),
    })?;
    writer.flush()?;

    info!(file_id, bytes, path = %name, "Downloaded file");
    Ok(bytes)
}
