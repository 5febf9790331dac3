//! Sponsor profile repository
//!
//! Encapsulates SeaORM operations for the single-row `sponsor_profiles` table.

use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryOrder, Set, TransactionTrait,
};

use crate::models::sponsor_profile::{self, Entity as SponsorProfile};

/// Column values for a replacement profile, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSponsorProfile {
    pub name: String,
    pub company_name: String,
    pub gst_number: String,
    pub annual_turnover: f64,
    pub tax_registration_path: Option<String>,
}

/// Result of a replace: the inserted row and whatever it displaced.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub profile: sponsor_profile::Model,
    pub previous: Vec<sponsor_profile::Model>,
}

impl Replacement {
    /// Attachment paths owned by displaced rows and no longer referenced.
    pub fn orphaned_paths(&self) -> Vec<String> {
        self.previous
            .iter()
            .filter_map(|row| row.tax_registration_path.clone())
            .filter(|path| self.profile.tax_registration_path.as_deref() != Some(path.as_str()))
            .collect()
    }
}

/// Repository for sponsor profile database operations
#[derive(Debug, Clone)]
pub struct SponsorProfileRepository {
    db: DatabaseConnection,
}

impl SponsorProfileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the stored profile, if any.
    ///
    /// Only one row should ever exist; the newest wins if that ever breaks.
    pub async fn current(&self) -> Result<Option<sponsor_profile::Model>> {
        let profile = SponsorProfile::find()
            .order_by_desc(sponsor_profile::Column::Id)
            .one(&self.db)
            .await?;
        Ok(profile)
    }

    /// Number of stored rows.
    pub async fn count(&self) -> Result<u64> {
        Ok(SponsorProfile::find().count(&self.db).await?)
    }

    /// Opens a transaction for use with [`Self::replace_within`].
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.db.begin().await
    }

    /// Replaces every stored row with `profile` in one transaction.
    pub async fn replace(&self, profile: NewSponsorProfile) -> Result<Replacement> {
        let txn = self.db.begin().await?;
        let replacement = Self::replace_within(&txn, profile).await?;
        txn.commit().await?;
        Ok(replacement)
    }

    /// Deletes all rows and inserts `profile` on `conn`.
    ///
    /// Not atomic by itself; callers pass a transaction.
    pub async fn replace_within<C>(
        conn: &C,
        profile: NewSponsorProfile,
    ) -> Result<Replacement, DbErr>
    where
        C: ConnectionTrait,
    {
        let previous = SponsorProfile::find().all(conn).await?;
        SponsorProfile::delete_many().exec(conn).await?;

        let inserted = sponsor_profile::ActiveModel {
            id: NotSet,
            name: Set(profile.name),
            company_name: Set(profile.company_name),
            gst_number: Set(Some(profile.gst_number)),
            annual_turnover: Set(Some(profile.annual_turnover)),
            tax_registration_path: Set(profile.tax_registration_path),
        }
        .insert(conn)
        .await?;

        Ok(Replacement {
            profile: inserted,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, path: Option<&str>) -> sponsor_profile::Model {
        sponsor_profile::Model {
            id,
            name: "Alice".to_string(),
            company_name: "Acme".to_string(),
            gst_number: None,
            annual_turnover: None,
            tax_registration_path: path.map(str::to_owned),
        }
    }

    #[test]
    fn test_orphaned_paths_skip_rows_without_files() {
        let replacement = Replacement {
            profile: row(3, Some("uploads/new.pdf")),
            previous: vec![row(1, None), row(2, Some("uploads/old.pdf"))],
        };

        assert_eq!(replacement.orphaned_paths(), vec!["uploads/old.pdf"]);
    }

    #[test]
    fn test_orphaned_paths_never_include_the_new_file() {
        let replacement = Replacement {
            profile: row(2, Some("uploads/same.pdf")),
            previous: vec![row(1, Some("uploads/same.pdf"))],
        };

        assert!(replacement.orphaned_paths().is_empty());
    }
}
