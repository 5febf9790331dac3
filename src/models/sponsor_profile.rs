//! Sponsor profile entity model
//!
//! SeaORM entity for the `sponsor_profiles` table. The table holds at most
//! one row; see [`crate::repositories::SponsorProfileRepository::replace_within`].

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sponsor_profiles")]
pub struct Model {
    /// Auto-assigned, never reused
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub company_name: String,
    pub gst_number: Option<String>,
    pub annual_turnover: Option<f64>,
    /// Server-local path of the uploaded tax registration PDF
    pub tax_registration_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// API view of a stored profile, with optional columns defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SponsorProfileDto {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = "Acme")]
    pub company_name: String,
    #[schema(example = "")]
    pub gst_number: String,
    #[schema(example = 0.0)]
    pub annual_turnover: f64,
    pub tax_registration_path: Option<String>,
}

impl From<Model> for SponsorProfileDto {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            company_name: model.company_name,
            gst_number: model.gst_number.unwrap_or_default(),
            annual_turnover: model.annual_turnover.unwrap_or_default(),
            tax_registration_path: model.tax_registration_path,
        }
    }
}
