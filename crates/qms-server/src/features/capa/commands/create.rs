//! Create CAPA command
//!
//! Inserts a new CAPA in `draft` status and records a `CREATE_CAPA` audit
//! entry in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{
    AuditContext, AuditError, EntityType, Mutation, NewAuditEntry, PostgresAuditStore,
};
use crate::features::capa::models::{
    Capa, CapaType, CAPA_COLUMNS, DESCRIPTION_MIN_LEN, TITLE_MAX_LEN, TITLE_MIN_LEN,
};
use crate::features::shared::{validate_text, TextValidationError};

/// Command to create a CAPA
///
/// # Examples
///
/// ```rust,ignore
/// use qms_server::features::capa::commands::CreateCapaCommand;
/// use qms_server::features::capa::models::CapaType;
///
/// let command = CreateCapaCommand {
///     title: "Coolant leak on line 3".to_string(),
///     description: "Coolant observed pooling under press 3B".to_string(),
///     capa_type: CapaType::Corrective,
///     root_cause: None,
///     immediate_action: Some("Line stopped".to_string()),
///     corrective_action: None,
///     preventive_action: None,
///     due_date: None,
///     assignee_id: 12,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCapaCommand {
    pub title: String,
    pub description: String,
    pub capa_type: CapaType,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub immediate_action: Option<String>,
    #[serde(default)]
    pub corrective_action: Option<String>,
    #[serde(default)]
    pub preventive_action: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: i64,
}

/// Errors that can occur when creating a CAPA
#[derive(Debug, thiserror::Error)]
pub enum CreateCapaError {
    #[error("{0}")]
    Validation(#[from] TextValidationError),
    #[error("assignee_id must be a positive user id")]
    InvalidAssignee,
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateCapaCommand {
    pub fn validate(&self) -> Result<(), CreateCapaError> {
        validate_text("title", &self.title, TITLE_MIN_LEN, Some(TITLE_MAX_LEN))?;
        validate_text("description", &self.description, DESCRIPTION_MIN_LEN, None)?;
        if self.assignee_id <= 0 {
            return Err(CreateCapaError::InvalidAssignee);
        }
        Ok(())
    }
}

/// Handles the create CAPA command
///
/// The insert and its audit entry commit together; if the audit append fails
/// the transaction is dropped and the CAPA is not created.
#[tracing::instrument(skip(audit, ctx, command), fields(actor_id = ctx.actor_id, title = %command.title))]
pub async fn handle(
    audit: &PostgresAuditStore,
    ctx: &AuditContext,
    command: CreateCapaCommand,
) -> Result<Capa, CreateCapaError> {
    command.validate()?;

    let mut tx = audit.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO capas (
            title, description, capa_type, root_cause, immediate_action,
            corrective_action, preventive_action, assignee_id, due_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        CAPA_COLUMNS
    );

    let capa = sqlx::query_as::<_, Capa>(&sql)
        .bind(command.title.trim())
        .bind(command.description.trim())
        .bind(command.capa_type)
        .bind(&command.root_cause)
        .bind(&command.immediate_action)
        .bind(&command.corrective_action)
        .bind(&command.preventive_action)
        .bind(command.assignee_id)
        .bind(command.due_date)
        .fetch_one(&mut *tx)
        .await?;

    let entry = NewAuditEntry::from_mutation(
        ctx,
        EntityType::Capa,
        Some(capa.id),
        Mutation::created(&capa)?,
    )?;
    let recorded = audit.append_in(&mut tx, &entry).await?;

    tx.commit().await?;

    tracing::info!(capa_id = capa.id, audit_id = recorded.id, "CAPA created");

    Ok(capa)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateCapaCommand {
        CreateCapaCommand {
            title: "Coolant leak".to_string(),
            description: "Coolant pooling under press 3B".to_string(),
            capa_type: CapaType::Corrective,
            root_cause: None,
            immediate_action: None,
            corrective_action: None,
            preventive_action: None,
            due_date: None,
            assignee_id: 4,
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command().validate().is_ok());
    }

    #[test]
    fn test_validation_short_title() {
        let cmd = CreateCapaCommand {
            title: "ab".to_string(),
            ..command()
        };
        assert!(matches!(
            cmd.validate(),
            Err(CreateCapaError::Validation(TextValidationError::TooShort { .. }))
        ));
    }

    #[test]
    fn test_validation_short_description() {
        let cmd = CreateCapaCommand {
            description: "too short".to_string(),
            ..command()
        };
        assert!(matches!(cmd.validate(), Err(CreateCapaError::Validation(_))));
    }

    #[test]
    fn test_validation_assignee() {
        let cmd = CreateCapaCommand {
            assignee_id: 0,
            ..command()
        };
        assert!(matches!(cmd.validate(), Err(CreateCapaError::InvalidAssignee)));
    }

    #[test]
    fn test_deserialize_minimal_body() {
        let cmd: CreateCapaCommand = serde_json::from_str(
            r#"{"title":"Leak","description":"Leak under press 3B","capa_type":"corrective","assignee_id":2}"#,
        )
        .unwrap();
        assert!(cmd.root_cause.is_none());
        assert_eq!(cmd.capa_type, CapaType::Corrective);
    }
}
