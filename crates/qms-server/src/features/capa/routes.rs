//! CAPA API routes
//!
//! - `POST /api/v1/capas` - Create a CAPA (audited)
//! - `GET /api/v1/capas` - List CAPAs (`skip`, `limit`, `status`, `assignee_id`)
//! - `GET /api/v1/capas/:id` - Get a CAPA
//! - `PUT /api/v1/capas/:id` - Partially update a CAPA (audited)
//! - `DELETE /api/v1/capas/:id` - Delete a CAPA (audited)
//!
//! Mutating endpoints require the `x-user-id` header.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::{
    commands::{
        CreateCapaCommand, CreateCapaError, DeleteCapaCommand, DeleteCapaError,
        UpdateCapaCommand, UpdateCapaError,
    },
    queries::{GetCapaError, GetCapaQuery, ListCapasError, ListCapasQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse, PageMeta};
use crate::api::AppState;
use crate::audit::{AuditContext, AuditError};

pub fn capa_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_capas).post(create_capa))
        .route("/:id", get(get_capa).put(update_capa).delete(delete_capa))
}

// ============================================================================
// Command Handlers
// ============================================================================

#[tracing::instrument(skip(state, ctx, command), fields(actor_id = ctx.actor_id))]
async fn create_capa(
    State(state): State<AppState>,
    ctx: AuditContext,
    Json(command): Json<CreateCapaCommand>,
) -> Result<Response, CapaApiError> {
    let capa = super::commands::create::handle(state.audit(), &ctx, command).await?;
    Ok(ApiResponse::success(capa).with_status(StatusCode::CREATED))
}

#[tracing::instrument(skip(state, ctx, command), fields(actor_id = ctx.actor_id))]
async fn update_capa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: AuditContext,
    Json(mut command): Json<UpdateCapaCommand>,
) -> Result<Response, CapaApiError> {
    command.id = id;
    let capa = super::commands::update::handle(state.audit(), &ctx, command).await?;
    Ok(ApiResponse::success(capa).into_response())
}

#[tracing::instrument(skip(state, ctx), fields(actor_id = ctx.actor_id))]
async fn delete_capa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ctx: AuditContext,
) -> Result<Response, CapaApiError> {
    let response =
        super::commands::delete::handle(state.audit(), &ctx, DeleteCapaCommand { id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

// ============================================================================
// Query Handlers
// ============================================================================

#[tracing::instrument(skip(state))]
async fn get_capa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, CapaApiError> {
    let capa = super::queries::get::handle(state.db(), GetCapaQuery { id }).await?;
    Ok(ApiResponse::success(capa).into_response())
}

#[tracing::instrument(skip(state, query))]
async fn list_capas(
    State(state): State<AppState>,
    Query(query): Query<ListCapasQuery>,
) -> Result<Response, CapaApiError> {
    let response = super::queries::list::handle(state.db(), query).await?;
    let meta = PageMeta::new(response.skip, response.limit, response.items.len());

    Ok(ApiResponse::success_with_meta(response.items, meta.to_value()).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for CAPA endpoints
#[derive(Debug, thiserror::Error)]
enum CapaApiError {
    #[error(transparent)]
    Create(#[from] CreateCapaError),
    #[error(transparent)]
    Update(#[from] UpdateCapaError),
    #[error(transparent)]
    Delete(#[from] DeleteCapaError),
    #[error(transparent)]
    Get(#[from] GetCapaError),
    #[error(transparent)]
    List(#[from] ListCapasError),
}

enum Outcome {
    BadRequest,
    NotFound,
    Internal,
}

fn audit_outcome(err: &AuditError) -> Outcome {
    if err.is_invalid_argument() {
        Outcome::BadRequest
    } else {
        Outcome::Internal
    }
}

impl CapaApiError {
    fn outcome(&self) -> Outcome {
        match self {
            Self::Create(CreateCapaError::Validation(_) | CreateCapaError::InvalidAssignee)
            | Self::Update(
                UpdateCapaError::NoFieldsToUpdate
                | UpdateCapaError::Validation(_)
                | UpdateCapaError::InvalidAssignee,
            )
            | Self::List(ListCapasError::InvalidSkip | ListCapasError::InvalidLimit) => {
                Outcome::BadRequest
            },
            Self::Update(UpdateCapaError::NotFound(_))
            | Self::Delete(DeleteCapaError::NotFound(_))
            | Self::Get(GetCapaError::NotFound(_)) => Outcome::NotFound,
            Self::Create(CreateCapaError::Audit(e))
            | Self::Update(UpdateCapaError::Audit(e))
            | Self::Delete(DeleteCapaError::Audit(e)) => audit_outcome(e),
            Self::Create(CreateCapaError::Database(_))
            | Self::Update(UpdateCapaError::Database(_))
            | Self::Delete(DeleteCapaError::Database(_))
            | Self::Get(GetCapaError::Database(_))
            | Self::List(ListCapasError::Database(_)) => Outcome::Internal,
        }
    }
}

impl IntoResponse for CapaApiError {
    fn into_response(self) -> Response {
        match self.outcome() {
            Outcome::BadRequest => ErrorResponse::new("VALIDATION_ERROR", self.to_string())
                .into_response_with(StatusCode::BAD_REQUEST),
            Outcome::NotFound => ErrorResponse::new("NOT_FOUND", self.to_string())
                .into_response_with(StatusCode::NOT_FOUND),
            Outcome::Internal => {
                tracing::error!(error = %self, "CAPA request failed");
                ErrorResponse::new("INTERNAL_ERROR", "The request could not be completed")
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            },
        }
    }
}
