//! Update CAPA command
//!
//! Partially updates a CAPA. Fields left out keep their current value; the
//! optional text fields and `due_date` are cleared by sending `null`. The
//! row is locked for the duration of the transaction so the before-image in
//! the audit entry is exactly what the update replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{
    AuditContext, AuditError, EntityType, Mutation, NewAuditEntry, PostgresAuditStore,
};
use crate::features::capa::models::{
    closed_date_after, Capa, CapaStatus, CAPA_COLUMNS, DESCRIPTION_MIN_LEN, TITLE_MAX_LEN,
    TITLE_MIN_LEN,
};
use crate::features::shared::{nullable, validate_text, TextValidationError};

/// Command to update an existing CAPA
///
/// `id` comes from the request path; at least one other field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCapaCommand {
    #[serde(skip)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CapaStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub immediate_action: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub corrective_action: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub preventive_action: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
}

/// Errors that can occur when updating a CAPA
#[derive(Debug, thiserror::Error)]
pub enum UpdateCapaError {
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,
    #[error("{0}")]
    Validation(#[from] TextValidationError),
    #[error("assignee_id must be a positive user id")]
    InvalidAssignee,
    #[error("CAPA {0} not found")]
    NotFound(i64),
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpdateCapaCommand {
    pub fn validate(&self) -> Result<(), UpdateCapaError> {
        if self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.root_cause.is_none()
            && self.immediate_action.is_none()
            && self.corrective_action.is_none()
            && self.preventive_action.is_none()
            && self.due_date.is_none()
            && self.assignee_id.is_none()
        {
            return Err(UpdateCapaError::NoFieldsToUpdate);
        }
        if let Some(ref title) = self.title {
            validate_text("title", title, TITLE_MIN_LEN, Some(TITLE_MAX_LEN))?;
        }
        if let Some(ref description) = self.description {
            validate_text("description", description, DESCRIPTION_MIN_LEN, None)?;
        }
        if matches!(self.assignee_id, Some(id) if id <= 0) {
            return Err(UpdateCapaError::InvalidAssignee);
        }
        Ok(())
    }

    /// The record that results from applying this command to `current`
    ///
    /// `updated_at` is left as is; the database stamps it.
    pub fn apply(&self, current: &Capa, now: DateTime<Utc>) -> Capa {
        let status = self.status.unwrap_or(current.status);

        Capa {
            id: current.id,
            title: self
                .title
                .as_deref()
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .as_deref()
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| current.description.clone()),
            capa_type: current.capa_type,
            status,
            root_cause: patched(&self.root_cause, &current.root_cause),
            immediate_action: patched(&self.immediate_action, &current.immediate_action),
            corrective_action: patched(&self.corrective_action, &current.corrective_action),
            preventive_action: patched(&self.preventive_action, &current.preventive_action),
            assignee_id: self.assignee_id.unwrap_or(current.assignee_id),
            due_date: self.due_date.unwrap_or(current.due_date),
            closed_date: closed_date_after(current.status, status, current.closed_date, now),
            created_at: current.created_at,
            updated_at: current.updated_at,
        }
    }
}

/// `current` unless the command set the field, possibly to `null`
fn patched<T: Clone>(update: &Option<Option<T>>, current: &Option<T>) -> Option<T> {
    match update {
        Some(value) => value.clone(),
        None => current.clone(),
    }
}

/// Handles the update CAPA command
#[tracing::instrument(skip(audit, ctx, command), fields(actor_id = ctx.actor_id, capa_id = command.id))]
pub async fn handle(
    audit: &PostgresAuditStore,
    ctx: &AuditContext,
    command: UpdateCapaCommand,
) -> Result<Capa, UpdateCapaError> {
    command.validate()?;

    let mut tx = audit.begin().await?;

    let before = sqlx::query_as::<_, Capa>(&format!(
        "SELECT {} FROM capas WHERE id = $1 FOR UPDATE",
        CAPA_COLUMNS
    ))
    .bind(command.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(UpdateCapaError::NotFound(command.id))?;

    let next = command.apply(&before, Utc::now());

    let sql = format!(
        r#"
        UPDATE capas
        SET title = $2, description = $3, status = $4, root_cause = $5,
            immediate_action = $6, corrective_action = $7, preventive_action = $8,
            assignee_id = $9, due_date = $10, closed_date = $11, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CAPA_COLUMNS
    );

    let after = sqlx::query_as::<_, Capa>(&sql)
        .bind(next.id)
        .bind(&next.title)
        .bind(&next.description)
        .bind(next.status)
        .bind(&next.root_cause)
        .bind(&next.immediate_action)
        .bind(&next.corrective_action)
        .bind(&next.preventive_action)
        .bind(next.assignee_id)
        .bind(next.due_date)
        .bind(next.closed_date)
        .fetch_one(&mut *tx)
        .await?;

    let entry = NewAuditEntry::from_mutation(
        ctx,
        EntityType::Capa,
        Some(after.id),
        Mutation::updated(&before, &after)?,
    )?;
    let recorded = audit.append_in(&mut tx, &entry).await?;

    tx.commit().await?;

    tracing::info!(
        capa_id = after.id,
        audit_id = recorded.id,
        from = %before.status,
        to = %after.status,
        "CAPA updated"
    );

    Ok(after)
}
