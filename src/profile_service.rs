//! Sponsor profile service.
//!
//! Owns the replace workflow: one submission at a time, the database swap
//! inside a single transaction, and the attachment moved into place only
//! when the row that references it is about to commit. Anything that fails
//! along the way rolls back the transaction and deletes the new file; the
//! previous profile and its attachment stay untouched. Once the commit
//! succeeds the displaced attachment is deleted.

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{Instrument, info, warn};

use crate::models::sponsor_profile;
use crate::repositories::{NewSponsorProfile, Replacement, SponsorProfileRepository};
use crate::uploads::{StagedUpload, UploadError, UploadStore};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    #[error("replace task failed: {0}")]
    Task(#[from] JoinError),
}

/// An accepted PDF attachment, held in memory until staged.
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// A validated submission. Optional fields are still optional here;
/// defaults are applied when the row is built.
#[derive(Debug, Clone, Default)]
pub struct ProfileSubmission {
    pub name: String,
    pub company_name: String,
    pub gst_number: Option<String>,
    pub annual_turnover: Option<f64>,
    pub tax_registration: Option<PdfAttachment>,
}

impl ProfileSubmission {
    fn into_row(self, tax_registration_path: Option<String>) -> NewSponsorProfile {
        NewSponsorProfile {
            name: self.name,
            company_name: self.company_name,
            gst_number: self.gst_number.unwrap_or_default(),
            annual_turnover: self.annual_turnover.unwrap_or(0.0),
            tax_registration_path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileService {
    repo: SponsorProfileRepository,
    uploads: UploadStore,
    // Serializes replace; reads do not take it.
    replace_lock: Arc<Mutex<()>>,
}

impl ProfileService {
    pub fn new(db: DatabaseConnection, uploads: UploadStore) -> Self {
        Self {
            repo: SponsorProfileRepository::new(db),
            uploads,
            replace_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn repository(&self) -> &SponsorProfileRepository {
        &self.repo
    }

    /// The stored profile, or `None` before the first submission.
    pub async fn current(&self) -> Result<Option<sponsor_profile::Model>, ProfileError> {
        self.repo.current().await.map_err(into_profile_error)
    }

    /// Replace the stored profile with `submission`.
    ///
    /// The work runs on its own task and finishes, cleanup included, even if
    /// the caller stops waiting for it.
    pub async fn replace(
        &self,
        submission: ProfileSubmission,
    ) -> Result<sponsor_profile::Model, ProfileError> {
        let service = self.clone();
        let task = async move { service.run_replace(submission).await }
            .instrument(tracing::Span::current());

        tokio::spawn(task).await?
    }

    async fn run_replace(
        &self,
        mut submission: ProfileSubmission,
    ) -> Result<sponsor_profile::Model, ProfileError> {
        let _guard = self.replace_lock.lock().await;

        let staged = match submission.tax_registration.take() {
            Some(attachment) => Some(
                self.uploads
                    .stage(attachment.file_name.as_deref(), &attachment.bytes)
                    .await?,
            ),
            None => None,
        };

        let row = submission.into_row(staged.as_ref().map(StagedUpload::stored_path));

        let replacement = match self.commit_replacement(row, staged.as_ref()).await {
            Ok(replacement) => replacement,
            Err(err) => {
                if let Some(staged) = &staged {
                    self.uploads.discard(staged).await;
                }
                return Err(err);
            }
        };

        for orphan in replacement.orphaned_paths() {
            if let Err(err) = self.uploads.remove(Path::new(&orphan)).await {
                warn!(path = %orphan, error = %err, "failed to delete replaced attachment");
            }
        }

        info!(
            profile_id = replacement.profile.id,
            replaced = replacement.previous.len(),
            has_attachment = replacement.profile.tax_registration_path.is_some(),
            "sponsor profile replaced"
        );

        Ok(replacement.profile)
    }

    async fn commit_replacement(
        &self,
        row: NewSponsorProfile,
        staged: Option<&StagedUpload>,
    ) -> Result<Replacement, ProfileError> {
        let txn = self.repo.begin().await?;

        let applied = async {
            let replacement = SponsorProfileRepository::replace_within(&txn, row).await?;
            if let Some(staged) = staged {
                self.uploads.promote(staged).await?;
            }
            Ok::<_, ProfileError>(replacement)
        }
        .await;

        match applied {
            Ok(replacement) => {
                txn.commit().await?;
                Ok(replacement)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "failed to roll back profile replace");
                }
                Err(err)
            }
        }
    }
}

fn into_profile_error(error: anyhow::Error) -> ProfileError {
    match error.downcast::<DbErr>() {
        Ok(db_err) => ProfileError::Database(db_err),
        Err(other) => ProfileError::Database(DbErr::Custom(other.to_string())),
    }
}
