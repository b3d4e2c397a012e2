//! HTTP transport for the catalog.
//!
//! | Route                          | Operation               |
//! |--------------------------------|-------------------------|
//! | `GET /products?page&size`      | list                    |
//! | `POST /products`               | create (201)            |
//! | `DELETE /products/{id}`        | delete (204)            |
//! | `GET /products/suggest?query`  | suggest                 |
//! | `GET /products/search?...`     | search                  |
//!
//! Write-path warnings are returned in `x-shelf-warning` headers, one per
//! warning. Errors are answered with a JSON `{"message": ...}` body.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shelf::{CatalogService, CatalogWarning, SearchRequest};
use shelf_core::{NewProduct, Product, ProductDocument, ProductId};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::Result;

/// Header carrying write-path warnings.
pub const WARNING_HEADER: &str = "x-shelf-warning";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    service: CatalogService,
    shutdown: CancellationToken,
}

impl AppState {
    /// State over `service`; `shutdown` cancels in-flight writes.
    pub fn new(service: CatalogService, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}

/// Build the catalog router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/suggest", get(suggest_products))
        .route("/products/search", get(search_products))
        .route("/products/{id}", delete(delete_product))
        .with_state(state)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listen address cannot be bound.
pub async fn serve(config: &ServerConfig, service: CatalogService) -> Result<()> {
    let shutdown = CancellationToken::new();
    let app = router(AppState::new(service, shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_size")]
    size: usize,
}

#[derive(Debug, Deserialize)]
struct SuggestParams {
    #[serde(default)]
    query: String,
}

fn default_page() -> usize {
    1
}

fn default_size() -> usize {
    10
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.service.list(params.page, params.size).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Json(new): Json<NewProduct>,
) -> std::result::Result<Response, ApiError> {
    let created = state
        .service
        .create_cancellable(new, &state.shutdown)
        .await?;
    Ok((
        StatusCode::CREATED,
        warning_headers(&created.warnings),
        Json(created.product),
    )
        .into_response())
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> std::result::Result<Response, ApiError> {
    let deleted = state.service.delete_cancellable(id, &state.shutdown).await?;
    Ok((StatusCode::NO_CONTENT, warning_headers(&deleted.warnings)).into_response())
}

async fn suggest_products(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> std::result::Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.suggest(&params.query).await?))
}

async fn search_products(
    State(state): State<AppState>,
    Query(request): Query<SearchRequest>,
) -> std::result::Result<Json<Vec<ProductDocument>>, ApiError> {
    Ok(Json(state.service.search(&request).await?))
}

fn warning_headers(warnings: &[CatalogWarning]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for warning in warnings {
        match HeaderValue::from_str(&warning.to_string()) {
            Ok(value) => {
                headers.append(WARNING_HEADER, value);
            }
            Err(_) => {
                let fallback = format!("product {} index write incomplete", warning.id());
                if let Ok(value) = HeaderValue::from_str(&fallback) {
                    headers.append(WARNING_HEADER, value);
                }
            }
        }
    }
    headers
}

// ============================================================================
// Errors
// ============================================================================

/// A catalog error answered over HTTP.
#[derive(Debug)]
pub struct ApiError(shelf_core::Error);

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            shelf_core::Error::Validation { .. } => StatusCode::BAD_REQUEST,
            shelf_core::Error::Persistence { .. } => StatusCode::SERVICE_UNAVAILABLE,
            shelf_core::Error::QueryExecution { .. } => StatusCode::BAD_GATEWAY,
            shelf_core::Error::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<shelf_core::Error> for ApiError {
    fn from(error: shelf_core::Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(
                error = ?self.0,
                error_msg = %self.0,
                status_code = %status_code,
                "Internal API error",
            );
        } else {
            tracing::warn!(
                error = ?self.0,
                error_msg = %self.0,
                status_code = %status_code,
                "API error",
            );
        }

        let body = ErrorBody {
            message: self.0.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

// ============================================================================
// Tests
// ============================================================================
