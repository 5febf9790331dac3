//! HTTP-level tests for the sponsor profile endpoints, driven through the router.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use sponsor_profile::config::AppConfig;
use sponsor_profile::server::{AppState, create_app};
use tempfile::TempDir;
use tower::ServiceExt;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::Part;

const PROFILE_PATH: &str = "/api/sponsor/profile";

struct TestApp {
    router: Router,
    state: AppState,
    upload_root: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let upload_root = TempDir::new().unwrap();
        let config = test_utils::test_config(&upload_root);
        Self::with_config(config, upload_root).await
    }

    async fn with_config(config: AppConfig, upload_root: TempDir) -> Self {
        let db = test_utils::setup_test_db().await.unwrap();
        let state = AppState::new(Arc::new(config), db);
        state.profiles.uploads().ensure_dirs().await.unwrap();
        let router = create_app(state.clone());
        Self {
            router,
            state,
            upload_root,
        }
    }

    fn upload_dir(&self) -> std::path::PathBuf {
        self.upload_root.path().join("uploads")
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn submit(&self, path: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, test_utils::multipart_content_type())
            .body(Body::from(test_utils::multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn pdf<'a>(bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "taxRegistration",
        file_name: "registration.pdf",
        content_type: "application/pdf",
        bytes,
    }
}

#[tokio::test]
async fn test_get_before_any_submission_returns_null_profile() {
    let app = TestApp::new().await;

    let (status, body) = app.get(PROFILE_PATH).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "profile": null }));
}

#[tokio::test]
async fn test_submit_without_file_applies_defaults() {
    let app = TestApp::new().await;

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[Part::Text("name", "Alice"), Part::Text("companyName", "Acme")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "profileId": 1 }));

    let (status, body) = app.get(PROFILE_PATH).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["profile"],
        json!({
            "id": 1,
            "name": "Alice",
            "company_name": "Acme",
            "gst_number": "",
            "annual_turnover": 0.0,
            "tax_registration_path": null,
        })
    );
}

#[tokio::test]
async fn test_submit_with_pdf_stores_file_and_replaces_previous() {
    let app = TestApp::new().await;

    let (status, first) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                Part::Text("gstNumber", "29ABCDE1234F1Z5"),
                Part::Text("annualTurnover", "1250000"),
                pdf(b"%PDF-1.4 first"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let first_id = first["profileId"].as_i64().unwrap();

    let (_, body) = app.get(PROFILE_PATH).await;
    let first_path = body["profile"]["tax_registration_path"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(body["profile"]["gst_number"], json!("29ABCDE1234F1Z5"));
    assert_eq!(body["profile"]["annual_turnover"], json!(1250000.0));
    assert!(first_path.ends_with(".pdf"));
    assert_eq!(std::fs::read(&first_path).unwrap(), b"%PDF-1.4 first");

    let (status, second) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Bob"),
                Part::Text("companyName", "Beta"),
                pdf(b"%PDF-1.4 second"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["profileId"].as_i64().unwrap(), first_id);

    let (_, body) = app.get(PROFILE_PATH).await;
    assert_eq!(body["profile"]["name"], json!("Bob"));
    assert_eq!(body["profile"]["gst_number"], json!(""));
    let second_path = body["profile"]["tax_registration_path"].as_str().unwrap();

    assert!(!Path::new(&first_path).exists());
    assert_eq!(
        test_utils::stored_files(&app.upload_dir()),
        vec![std::path::PathBuf::from(second_path)]
    );
    assert_eq!(app.state.profiles.repository().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_company_name_is_rejected_without_side_effects() {
    let app = TestApp::new().await;

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[Part::Text("name", "Alice"), pdf(b"%PDF-1.4")],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
    assert_eq!(body["error"], json!("Name and Company Name are required."));
    assert_eq!(body["details"]["missing"], json!(["companyName"]));

    assert!(test_utils::stored_files(&app.upload_dir()).is_empty());
    let (_, body) = app.get(PROFILE_PATH).await;
    assert_eq!(body["profile"], Value::Null);
}

#[tokio::test]
async fn test_whitespace_name_counts_as_missing() {
    let app = TestApp::new().await;

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[Part::Text("name", "   "), Part::Text("companyName", "Acme")],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["missing"], json!(["name"]));
}

#[tokio::test]
async fn test_non_pdf_attachment_is_rejected_and_prior_profile_kept() {
    let app = TestApp::new().await;
    let (status, _) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                pdf(b"%PDF-1.4 kept"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, before) = app.get(PROFILE_PATH).await;

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Mallory"),
                Part::Text("companyName", "Evil"),
                Part::File {
                    name: "taxRegistration",
                    file_name: "photo.png",
                    content_type: "image/png",
                    bytes: b"\x89PNG",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));
    assert_eq!(body["details"]["field"], json!("taxRegistration"));

    let (_, after) = app.get(PROFILE_PATH).await;
    assert_eq!(before, after);
    assert_eq!(test_utils::stored_files(&app.upload_dir()).len(), 1);
}

#[tokio::test]
async fn test_invalid_turnover_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                Part::Text("annualTurnover", "a lot"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], json!("annualTurnover"));
}

#[tokio::test]
async fn test_empty_file_part_means_no_file() {
    let app = TestApp::new().await;

    let (status, _) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                Part::File {
                    name: "taxRegistration",
                    file_name: "",
                    content_type: "application/octet-stream",
                    bytes: b"",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(PROFILE_PATH).await;
    assert_eq!(body["profile"]["tax_registration_path"], Value::Null);
}

#[tokio::test]
async fn test_unknown_fields_are_ignored() {
    let app = TestApp::new().await;

    let (status, _) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                Part::Text("favouriteColour", "teal"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_short_profile_path_shares_the_same_store() {
    let app = TestApp::new().await;

    let (status, _) = app
        .submit(
            "/profile",
            &[Part::Text("name", "Alice"), Part::Text("companyName", "Acme")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(PROFILE_PATH).await;
    assert_eq!(body["profile"]["name"], json!("Alice"));

    let (_, body) = app.get("/profile").await;
    assert_eq!(body["profile"]["company_name"], json!("Acme"));
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri(PROFILE_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Alice","companyName":"Acme"}"#))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let upload_root = TempDir::new().unwrap();
    let config = AppConfig {
        max_upload_bytes: 1024,
        ..test_utils::test_config(&upload_root)
    };
    let app = TestApp::with_config(config, upload_root).await;
    let big = vec![b'x'; 4096];

    let (status, body) = app
        .submit(
            PROFILE_PATH,
            &[
                Part::Text("name", "Alice"),
                Part::Text("companyName", "Acme"),
                pdf(&big),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], json!("PAYLOAD_TOO_LARGE"));
    assert!(test_utils::stored_files(&app.upload_dir()).is_empty());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], json!("Sponsor Profile API"));
    assert!(body["paths"].get(PROFILE_PATH).is_some());
}
