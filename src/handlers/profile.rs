//! # Sponsor Profile Handlers
//!
//! `GET` returns the stored profile; `POST` replaces it from a multipart form.

use axum::{
    extract::{
        State,
        multipart::{Field, Multipart, MultipartError, MultipartRejection},
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};
use crate::models::sponsor_profile::SponsorProfileDto;
use crate::profile_service::{PdfAttachment, ProfileSubmission};
use crate::server::AppState;
use crate::uploads::ensure_pdf;

pub const FIELD_NAME: &str = "name";
pub const FIELD_COMPANY_NAME: &str = "companyName";
pub const FIELD_GST_NUMBER: &str = "gstNumber";
pub const FIELD_ANNUAL_TURNOVER: &str = "annualTurnover";
pub const FIELD_TAX_REGISTRATION: &str = "taxRegistration";

/// Response payload for profile retrieval
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    /// The stored profile, or `null` if none has been submitted
    pub profile: Option<SponsorProfileDto>,
}

/// Response payload for a successful submission
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileResponse {
    pub success: bool,
    /// Identifier of the newly stored profile
    #[schema(example = 1)]
    pub profile_id: i32,
}

/// Multipart form accepted by the submit endpoint (documentation only)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileForm {
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = "Acme")]
    pub company_name: String,
    pub gst_number: Option<String>,
    #[schema(example = "1250000")]
    pub annual_turnover: Option<String>,
    /// PDF only
    #[schema(value_type = Option<String>, format = Binary)]
    pub tax_registration: Option<Vec<u8>>,
}

/// Raw form values as they arrived, before validation.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub gst_number: Option<String>,
    pub annual_turnover: Option<String>,
    pub tax_registration: Option<PdfAttachment>,
}

impl ProfileForm {
    /// Drain `multipart`, rejecting a non-PDF attachment before its body is read.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(field_name) = field.name().map(str::to_owned) else {
                continue;
            };

            match field_name.as_str() {
                FIELD_NAME => form.name = Some(field.text().await?),
                FIELD_COMPANY_NAME => form.company_name = Some(field.text().await?),
                FIELD_GST_NUMBER => form.gst_number = Some(field.text().await?),
                FIELD_ANNUAL_TURNOVER => form.annual_turnover = Some(field.text().await?),
                FIELD_TAX_REGISTRATION => {
                    let file_name = field.file_name().map(str::to_owned);
                    let unnamed = file_name.as_deref().unwrap_or_default().is_empty();

                    // Browsers send an empty, nameless part when no file was chosen.
                    if let Err(err) = ensure_pdf(field.content_type()) {
                        if unnamed && !has_content(&mut field).await? {
                            continue;
                        }
                        return Err(err.into());
                    }

                    let bytes = field.bytes().await?;
                    if unnamed && bytes.is_empty() {
                        continue;
                    }

                    if form.tax_registration.is_some() {
                        return Err(validation_error(
                            "Only one tax registration file may be uploaded.",
                            json!({ "field": FIELD_TAX_REGISTRATION }),
                        ));
                    }

                    form.tax_registration = Some(PdfAttachment { file_name, bytes });
                }
                other => {
                    tracing::debug!(field = other, "ignoring unknown form field");
                }
            }
        }

        Ok(form)
    }

    /// Check required fields and parse the turnover.
    pub fn into_submission(self) -> Result<ProfileSubmission, ApiError> {
        let name = self.name.filter(|v| !v.trim().is_empty());
        let company_name = self.company_name.filter(|v| !v.trim().is_empty());

        let (Some(name), Some(company_name)) = (name.clone(), company_name.clone()) else {
            let missing: Vec<&str> = [
                (FIELD_NAME, name.is_none()),
                (FIELD_COMPANY_NAME, company_name.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, missing)| missing.then_some(field))
            .collect();

            return Err(validation_error(
                "Name and Company Name are required.",
                json!({ "missing": missing }),
            ));
        };

        let annual_turnover = match self.annual_turnover.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        validation_error(
                            "Annual turnover must be a number.",
                            json!({ "field": FIELD_ANNUAL_TURNOVER, "value": raw }),
                        )
                    })?,
            ),
        };

        Ok(ProfileSubmission {
            name,
            company_name,
            gst_number: self.gst_number,
            annual_turnover,
            tax_registration: self.tax_registration,
        })
    }
}

// Reads at most up to the first non-empty chunk.
async fn has_content(field: &mut Field<'_>) -> Result<bool, MultipartError> {
    while let Some(chunk) = field.chunk().await? {
        if !chunk.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Get the current sponsor profile
#[utoipa::path(
    get,
    path = "/api/sponsor/profile",
    responses(
        (status = 200, description = "Stored profile, or null", body = ProfileResponse),
        (status = 500, description = "Storage failure", body = crate::error::ApiErrorBody)
    ),
    tag = "sponsor"
)]
pub async fn get_profile(State(state): State<AppState>) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.current().await?;

    Ok(Json(ProfileResponse {
        profile: profile.map(SponsorProfileDto::from),
    }))
}

/// Replace the sponsor profile
#[utoipa::path(
    post,
    path = "/api/sponsor/profile",
    request_body(content = SubmitProfileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile stored", body = SubmitProfileResponse),
        (status = 400, description = "Missing required field, non-PDF attachment or malformed form", body = crate::error::ApiErrorBody),
        (status = 413, description = "Body exceeds the upload limit", body = crate::error::ApiErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ApiErrorBody)
    ),
    tag = "sponsor"
)]
pub async fn submit_profile(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitProfileResponse>, ApiError> {
    let mut multipart = multipart?;
    let submission = ProfileForm::from_multipart(&mut multipart)
        .await?
        .into_submission()?;

    let profile = state.profiles.replace(submission).await?;

    Ok(Json(SubmitProfileResponse {
        success: true,
        profile_id: profile.id,
    }))
}
