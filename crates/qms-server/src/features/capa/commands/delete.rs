//! Delete CAPA command
//!
//! Removes a CAPA and records a `DELETE_CAPA` entry carrying the deleted
//! row as its before-image.

use serde::{Deserialize, Serialize};

use crate::audit::{
    AuditContext, AuditError, EntityType, Mutation, NewAuditEntry, PostgresAuditStore,
};
use crate::features::capa::models::{Capa, CAPA_COLUMNS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteCapaCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCapaResponse {
    pub id: i64,
    pub audit_id: i64,
}

/// Errors that can occur when deleting a CAPA
#[derive(Debug, thiserror::Error)]
pub enum DeleteCapaError {
    #[error("CAPA {0} not found")]
    NotFound(i64),
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handles the delete CAPA command
#[tracing::instrument(skip(audit, ctx), fields(actor_id = ctx.actor_id))]
pub async fn handle(
    audit: &PostgresAuditStore,
    ctx: &AuditContext,
    command: DeleteCapaCommand,
) -> Result<DeleteCapaResponse, DeleteCapaError> {
    let mut tx = audit.begin().await?;

    let before = sqlx::query_as::<_, Capa>(&format!(
        "DELETE FROM capas WHERE id = $1 RETURNING {}",
        CAPA_COLUMNS
    ))
    .bind(command.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DeleteCapaError::NotFound(command.id))?;

    let entry = NewAuditEntry::from_mutation(
        ctx,
        EntityType::Capa,
        Some(before.id),
        Mutation::deleted(&before)?,
    )?;
    let recorded = audit.append_in(&mut tx, &entry).await?;

    tx.commit().await?;

    tracing::info!(capa_id = before.id, audit_id = recorded.id, "CAPA deleted");

    Ok(DeleteCapaResponse {
        id: before.id,
        audit_id: recorded.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DeleteCapaError::NotFound(5).to_string(), "CAPA 5 not found");
    }
}
