//! Audit trail API routes
//!
//! - `GET /api/v1/audit` - Query the audit log. Accepts `entity_type`,
//!   `entity_id`, `actor_id`, `action`, `start_time`, `end_time` (RFC 3339),
//!   `skip` and `limit`.
//! - `GET /api/v1/audit/:entity_type/:entity_id` - History of one entity
//!
//! Reads are not themselves audited.

use axum::{
    extract::{rejection::QueryRejection, FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::AuditError;
use super::models::{AuditQuery, EntityType, PageRequest};
use super::store::AuditStore;
use crate::api::response::{ApiResponse, ErrorResponse, PageMeta};
use crate::config::AuditConfig;

/// What the audit endpoints read from
///
/// The application derives this from its own state; it can also be built
/// directly to serve any [`AuditStore`] on its own.
#[derive(Clone)]
pub struct AuditApiState {
    store: Arc<dyn AuditStore>,
    config: AuditConfig,
}

impl AuditApiState {
    pub fn new(store: Arc<dyn AuditStore>, config: AuditConfig) -> Self {
        Self { store, config }
    }
}

pub fn audit_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AuditApiState: FromRef<S>,
{
    Router::new()
        .route("/", get(query_audit_log))
        .route("/:entity_type/:entity_id", get(entity_trail))
}

#[derive(Debug, Deserialize)]
struct EntityPath {
    entity_type: EntityType,
    entity_id: i64,
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    skip: Option<i64>,
    limit: Option<i64>,
}

#[tracing::instrument(skip(state, query))]
async fn query_audit_log(
    State(state): State<AuditApiState>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Response, AuditApiError> {
    let Query(query) = query?;
    let limits = state.config;
    let (filter, page) = query.into_parts_with(limits.default_limit, limits.max_limit)?;

    let records = state.store.query(filter, page).await?;

    tracing::debug!(count = records.len(), "Audit log queried via API");

    let meta = PageMeta::new(page.skip(), page.limit(), records.len());
    Ok(ApiResponse::success_with_meta(records, meta.to_value()).into_response())
}

#[tracing::instrument(skip(state, params))]
async fn entity_trail(
    State(state): State<AuditApiState>,
    Path(path): Path<EntityPath>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Response, AuditApiError> {
    let Query(params) = params?;
    let limits = state.config;
    let page = PageRequest::bounded(
        params.skip.unwrap_or(0),
        params.limit.unwrap_or(limits.default_limit),
        limits.max_limit,
    )?;

    let records = state
        .store
        .entity_trail(path.entity_type, path.entity_id, page)
        .await?;

    let meta = PageMeta::new(page.skip(), page.limit(), records.len());
    Ok(ApiResponse::success_with_meta(records, meta.to_value()).into_response())
}

#[derive(Debug, thiserror::Error)]
enum AuditApiError {
    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl IntoResponse for AuditApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Query(_) | Self::Audit(AuditError::InvalidArgument(_)) => {
                ErrorResponse::new("INVALID_ARGUMENT", self.to_string())
                    .into_response_with(StatusCode::BAD_REQUEST)
            },
            Self::Audit(ref e) => {
                tracing::error!(error = %e, "Audit query failed");
                ErrorResponse::new("INTERNAL_ERROR", "The audit log could not be read")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }
}
