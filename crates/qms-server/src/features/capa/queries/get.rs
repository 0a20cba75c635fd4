//! Get CAPA query

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::capa::models::{Capa, CAPA_COLUMNS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetCapaQuery {
    pub id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetCapaError {
    #[error("CAPA {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: &PgPool, query: GetCapaQuery) -> Result<Capa, GetCapaError> {
    sqlx::query_as::<_, Capa>(&format!("SELECT {} FROM capas WHERE id = $1", CAPA_COLUMNS))
        .bind(query.id)
        .fetch_optional(pool)
        .await?
        .ok_or(GetCapaError::NotFound(query.id))
}
