//! # Server Configuration
//!
//! Router assembly, shared state and the serve loop for the Sponsor Profile API.

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use sea_orm::DatabaseConnection;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::Instrument;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers::{self, profile};
use crate::profile_service::ProfileService;
use crate::telemetry::{self, TraceContext};
use crate::uploads::UploadStore;

const REQUEST_ID_HEADER: &str = "x-request-id";
const TRACE_ID_HEADER: &str = "x-trace-id";

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        let uploads = UploadStore::new(config.upload_dir.clone());
        let profiles = ProfileService::new(db.clone(), uploads);
        Self {
            config,
            db,
            profiles,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let profile_routes = get(profile::get_profile).post(profile::submit_profile);

    let router = Router::new()
        .route("/api/sponsor/profile", profile_routes.clone())
        .route("/profile", profile_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    // A configured static directory owns `/` and every unmatched path.
    let router = match state.config.static_dir.as_ref() {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router
            .route("/", get(handlers::root))
            .fallback(handlers::not_found),
    };

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context))
        .layer(TraceLayer::new_for_http())
}

/// Scope each request in a trace context and echo its id back to the caller.
async fn trace_context(request: Request, next: Next) -> Response {
    let context = TraceContext::from_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    let trace_id = context.trace_id.clone();
    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = telemetry::with_trace_context(context, next.run(request))
        .instrument(span)
        .await;

    if !response.headers().contains_key(TRACE_ID_HEADER)
        && let Ok(value) = HeaderValue::from_str(&trace_id)
    {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let state = AppState::new(Arc::new(config), db);
    state.profiles.uploads().ensure_dirs().await?;
    state.profiles.uploads().clear_staging().await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        address = %addr,
        profile = %state.config.profile,
        upload_dir = %state.config.upload_dir.display(),
        "server listening"
    );

    let app = create_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::profile::get_profile,
        crate::handlers::profile::submit_profile,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthStatus,
            crate::handlers::profile::ProfileResponse,
            crate::handlers::profile::SubmitProfileResponse,
            crate::handlers::profile::SubmitProfileForm,
            crate::models::sponsor_profile::SponsorProfileDto,
            crate::error::ApiErrorBody,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "operations", description = "Liveness and readiness probes"),
        (name = "sponsor", description = "Sponsor profile submission and retrieval"),
    ),
    info(
        title = "Sponsor Profile API",
        description = "Stores the sponsor's company profile and tax registration document",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
