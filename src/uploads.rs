//! Local storage for tax-registration PDFs.
//!
//! Uploads are first written to a staging area inside the upload directory
//! and only renamed into place once the owning database row is inserted.
//! Staging and final paths share a filesystem, so promotion is a rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// The only content type accepted for tax-registration attachments.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const STAGING_DIR: &str = ".staging";
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only PDF files are allowed (got `{content_type}`)")]
    UnsupportedContentType { content_type: String },
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl UploadError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reject anything whose declared content type is not exactly `application/pdf`.
pub fn ensure_pdf(content_type: Option<&str>) -> Result<(), UploadError> {
    match content_type {
        Some(PDF_CONTENT_TYPE) => Ok(()),
        other => Err(UploadError::UnsupportedContentType {
            content_type: other.unwrap_or("<none>").to_string(),
        }),
    }
}

/// Extension of the client-side filename, including the dot, if it is safe to reuse.
pub fn sanitized_extension(original_name: Option<&str>) -> Option<String> {
    let name = original_name?;
    // Clients may send a full path; only the final component matters.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// A file written to the staging area, waiting to be promoted.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub staging_path: PathBuf,
    pub final_path: PathBuf,
    pub size: usize,
}

impl StagedUpload {
    /// The path recorded on the profile row once promoted.
    pub fn stored_path(&self) -> String {
        self.final_path.to_string_lossy().into_owned()
    }
}

/// Filesystem sink for accepted uploads.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Create the upload directory and its staging area.
    pub async fn ensure_dirs(&self) -> Result<(), UploadError> {
        let staging = self.staging_dir();
        fs::create_dir_all(&staging)
            .await
            .map_err(|e| UploadError::io("create directory", &staging, e))
    }

    /// Delete leftovers in the staging area from a previous run.
    ///
    /// Call only while no replace is in flight.
    pub async fn clear_staging(&self) -> Result<usize, UploadError> {
        let staging = self.staging_dir();
        let mut entries = match fs::read_dir(&staging).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(UploadError::io("read directory", &staging, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| UploadError::io("read directory", &staging, e))?
        {
            let path = entry.path();
            if path.is_file() {
                self.remove(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            warn!(removed, dir = %staging.display(), "uploads: cleared stale staged files");
        }
        Ok(removed)
    }

    /// Timestamp-derived final name: `<unix-millis>-<8 hex><.ext>`.
    pub fn final_path_for(&self, original_name: Option<&str>) -> PathBuf {
        let suffix = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            &suffix[..8],
            sanitized_extension(original_name).unwrap_or_default()
        );
        self.root.join(file_name)
    }

    /// Write `data` to the staging area.
    pub async fn stage(
        &self,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<StagedUpload, UploadError> {
        self.ensure_dirs().await?;

        let staging_path = self
            .staging_dir()
            .join(format!("{}.part", Uuid::new_v4().simple()));
        let final_path = self.final_path_for(original_name);
        debug!(staging_path = %staging_path.display(), size = data.len(), "uploads: stage");

        let mut file = fs::File::create(&staging_path)
            .await
            .map_err(|e| UploadError::io("create", &staging_path, e))?;
        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            remove_quietly(&staging_path).await;
            return Err(UploadError::io("write", &staging_path, e));
        }

        Ok(StagedUpload {
            staging_path,
            final_path,
            size: data.len(),
        })
    }

    /// Move a staged upload to its final path.
    pub async fn promote(&self, staged: &StagedUpload) -> Result<(), UploadError> {
        fs::rename(&staged.staging_path, &staged.final_path)
            .await
            .map_err(|e| {
                warn!(
                    from = %staged.staging_path.display(),
                    to = %staged.final_path.display(),
                    error = %e,
                    "uploads: promote failed"
                );
                UploadError::io("promote", &staged.final_path, e)
            })
    }

    /// Undo a staged upload wherever it currently lives.
    pub async fn discard(&self, staged: &StagedUpload) {
        remove_quietly(&staged.staging_path).await;
        remove_quietly(&staged.final_path).await;
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<(), UploadError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadError::io("remove", path, e)),
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "uploads: cleanup failed");
    }
}
