//! PostgreSQL-backed audit store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::error::{AuditError, AuditResult};
use super::models::{AuditAction, AuditEntry, AuditFilter, EntityType, NewAuditEntry, PageRequest};
use super::store::AuditStore;

const AUDIT_COLUMNS: &str = "id, timestamp, actor_id, action, entity_type, entity_id, \
     old_state, new_state, source_address, client_agent";

/// Raw `audit_log` row; text columns are parsed into typed fields afterwards
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    timestamp: DateTime<Utc>,
    actor_id: i64,
    action: String,
    entity_type: String,
    entity_id: Option<i64>,
    old_state: Option<JsonValue>,
    new_state: Option<JsonValue>,
    source_address: Option<String>,
    client_agent: Option<String>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = AuditError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| AuditError::CorruptEntry { id: row.id, reason };

        let action = row
            .action
            .parse::<AuditAction>()
            .map_err(|e| corrupt(e.to_string()))?;
        let entity_type = row
            .entity_type
            .parse::<EntityType>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(AuditEntry {
            id: row.id,
            timestamp: row.timestamp,
            actor_id: row.actor_id,
            action,
            entity_type,
            entity_id: row.entity_id,
            old_state: row.old_state,
            new_state: row.new_state,
            source_address: row.source_address,
            client_agent: row.client_agent,
        })
    }
}

async fn insert_entry<'e, E>(executor: E, entry: &NewAuditEntry) -> AuditResult<AuditEntry>
where
    E: PgExecutor<'e>,
{
    entry.validate()?;

    let sql = format!(
        r#"
        INSERT INTO audit_log (
            actor_id, action, entity_type, entity_id,
            old_state, new_state, source_address, client_agent
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        AUDIT_COLUMNS
    );

    let row = sqlx::query_as::<_, AuditRow>(&sql)
        .bind(entry.actor_id)
        .bind(entry.action.to_string())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(&entry.old_state)
        .bind(&entry.new_state)
        .bind(&entry.source_address)
        .bind(&entry.client_agent)
        .fetch_one(executor)
        .await?;

    let record = AuditEntry::try_from(row)?;

    debug!(
        audit_id = record.id,
        action = %record.action,
        entity_id = ?record.entity_id,
        "Created audit log entry"
    );

    Ok(record)
}

/// [`AuditStore`] over the `audit_log` table
#[derive(Debug, Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Start a transaction on the store's pool
    ///
    /// Domain writes made on it and entries recorded with [`append_in`]
    /// commit or roll back together.
    ///
    /// [`append_in`]: PostgresAuditStore::append_in
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Record an entry inside the caller's transaction
    ///
    /// The entry becomes visible to queries only when `tx` commits.
    pub async fn append_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewAuditEntry,
    ) -> AuditResult<AuditEntry> {
        insert_entry(&mut **tx, entry).await
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> AuditResult<AuditEntry> {
        insert_entry(&self.pool, &entry).await
    }

    async fn query(&self, filter: AuditFilter, page: PageRequest) -> AuditResult<Vec<AuditEntry>> {
        filter.validate()?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM audit_log WHERE TRUE", AUDIT_COLUMNS));

        if let Some(entity_type) = filter.entity_type {
            builder.push(" AND entity_type = ").push_bind(entity_type.as_str());
        }
        if let Some(entity_id) = filter.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(actor_id) = filter.actor_id {
            builder.push(" AND actor_id = ").push_bind(actor_id);
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ").push_bind(action.to_string());
        }
        if let Some(start_time) = filter.start_time {
            builder.push(" AND timestamp >= ").push_bind(start_time);
        }
        if let Some(end_time) = filter.end_time {
            builder.push(" AND timestamp <= ").push_bind(end_time);
        }

        builder
            .push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.skip());

        let rows = builder
            .build_query_as::<AuditRow>()
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(AuditEntry::try_from)
            .collect::<AuditResult<Vec<_>>>()?;

        debug!(count = records.len(), "Queried audit logs");

        Ok(records)
    }
}
