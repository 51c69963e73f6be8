//! HTTP API for the capture store and compositor
//!
//! The browser overlay drives every endpoint; the editor-extension chat
//! integration only reads the listing and image endpoints. CORS is wide
//! open because the overlay script is injected into arbitrary origins.

use crate::annotation::Annotation;
use crate::capture::{CaptureMetadata, CaptureSummary};
use crate::compositor::{self, OutputFormat};
use crate::error::CaptureError;
use crate::geometry::Region;
use crate::store::{CaptureOptions, CaptureStore};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9876,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("CAPTURE_HOST").unwrap_or(defaults.host),
            port: std::env::var("CAPTURE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CaptureStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Arc::new(CaptureStore::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the application router with middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/capture", post(create_capture))
        .route("/api/captures", get(list_captures))
        .route(
            "/api/captures/{id}",
            get(get_capture).delete(delete_capture),
        )
        .route("/api/captures/{id}/image", get(get_capture_image))
        .route("/api/captures/{id}/annotations/box", post(add_box_annotation))
        .route(
            "/api/captures/{id}/annotations/text",
            post(add_text_annotation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/* --------------------------------------------------------------------------
   Request / response payloads
   -------------------------------------------------------------------------- */

/// Body of `POST /api/capture`.
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    /// Monitor index, accepted for contract compatibility with the
    /// overlay; the core only handles client-rendered images.
    #[serde(default)]
    pub monitor: i64,
    #[serde(default)]
    pub region: Option<Region>,
    /// Base64 data URL or bare base64 of the client-rendered image.
    #[serde(rename = "imageData")]
    pub image_data: String,
    /// Device pixel ratio of the capturing client; absent means 1.
    #[serde(default, rename = "pixelRatio")]
    pub pixel_ratio: Option<f64>,
    #[serde(default, rename = "scrollX")]
    pub scroll_x: u32,
    #[serde(default, rename = "scrollY")]
    pub scroll_y: u32,
}

#[derive(Debug, Serialize)]
pub struct CaptureCreated {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

/// Body of `POST /api/captures/{id}/annotations/box`.
#[derive(Debug, Deserialize)]
pub struct BoxAnnotationRequest {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
}

/// Body of `POST /api/captures/{id}/annotations/text`.
#[derive(Debug, Deserialize)]
pub struct TextAnnotationRequest {
    pub x: i32,
    pub y: i32,
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_color() -> String {
    "red".to_string()
}

fn default_line_width() -> u32 {
    3
}

fn default_font_size() -> u32 {
    20
}

fn default_background() -> String {
    "white".to_string()
}

#[derive(Debug, Serialize)]
pub struct AnnotationAdded {
    pub annotation_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub capture_count: usize,
}

/* --------------------------------------------------------------------------
   Error mapping
   -------------------------------------------------------------------------- */

/// Wrapper that maps [`CaptureError`] onto HTTP responses.
pub struct ApiError(CaptureError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            CaptureError::Decode(_) => (StatusCode::BAD_REQUEST, "DECODE_ERROR"),
            CaptureError::InvalidRegion(_) => (StatusCode::BAD_REQUEST, "INVALID_REGION"),
            CaptureError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
            CaptureError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            CaptureError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CaptureError::Encode(msg) => {
                tracing::error!(error = %msg, "Image encoding failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        capture_count: state.store.len(),
    })
}

/// POST /api/capture
async fn create_capture(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> ApiResult<impl IntoResponse> {
    info!(
        monitor = request.monitor,
        has_region = request.region.is_some(),
        data_len = request.image_data.len(),
        "Capture request"
    );

    let image_bytes = decode_image_data(&request.image_data)?;
    let options = CaptureOptions {
        region: request.region,
        pixel_ratio: request.pixel_ratio,
        scroll_x: request.scroll_x,
        scroll_y: request.scroll_y,
    };
    let summary = state.store.create_capture(&image_bytes, &options)?;

    Ok((
        StatusCode::CREATED,
        Json(CaptureCreated {
            id: summary.id,
            width: summary.width,
            height: summary.height,
        }),
    ))
}

/// GET /api/captures
async fn list_captures(State(state): State<AppState>) -> Json<Vec<CaptureSummary>> {
    Json(state.store.list())
}

/// GET /api/captures/{id}
async fn get_capture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CaptureMetadata>> {
    Ok(Json(state.store.get(&id)?))
}

/// DELETE /api/captures/{id}
async fn delete_capture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.remove(&id)?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/captures/{id}/image?format=png
async fn get_capture_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Response> {
    let format = OutputFormat::parse(query.format.as_deref().unwrap_or("png"))?;
    let (base_image, annotations) = state.store.snapshot(&id)?;
    let bytes = compositor::render(&base_image, &annotations, format)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response())
}

/// POST /api/captures/{id}/annotations/box
async fn add_box_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BoxAnnotationRequest>,
) -> ApiResult<Json<AnnotationAdded>> {
    let annotation = Annotation::Box {
        x: request.x,
        y: request.y,
        width: request.width,
        height: request.height,
        color: request.color,
        line_width: request.line_width,
    };
    let annotation_count = state.store.append_annotation(&id, annotation)?;
    Ok(Json(AnnotationAdded { annotation_count }))
}

/// POST /api/captures/{id}/annotations/text
async fn add_text_annotation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TextAnnotationRequest>,
) -> ApiResult<Json<AnnotationAdded>> {
    let annotation = Annotation::Text {
        x: request.x,
        y: request.y,
        text: request.text,
        font_size: request.font_size,
        color: request.color,
        background: request.background,
    };
    let annotation_count = state.store.append_annotation(&id, annotation)?;
    Ok(Json(AnnotationAdded { annotation_count }))
}

/// Strip an optional `data:image/...;base64,` prefix and decode.
fn decode_image_data(data: &str) -> Result<Vec<u8>, CaptureError> {
    let encoded = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };
    BASE64
        .decode(encoded.trim())
        .map_err(|e| CaptureError::Decode(format!("invalid base64 image data: {e}")))
}
