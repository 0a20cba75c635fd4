//! Audit store abstraction

use async_trait::async_trait;

use super::error::AuditResult;
use super::models::{AuditEntry, AuditFilter, EntityType, NewAuditEntry, PageRequest};

/// Append-only, queryable audit log
///
/// Implementations assign `id` and `timestamp` on append. Ids are strictly
/// increasing in append order and timestamps never decrease along that order.
/// There is no operation to modify or remove an entry once appended.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Validate and durably record one entry, returning it as stored.
    async fn append(&self, entry: NewAuditEntry) -> AuditResult<AuditEntry>;

    /// Entries matching `filter`, newest first (timestamp desc, then id desc),
    /// after skipping `page.skip()` and capped at `page.limit()`.
    async fn query(&self, filter: AuditFilter, page: PageRequest) -> AuditResult<Vec<AuditEntry>>;

    /// Full history of a single entity
    async fn entity_trail(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        page: PageRequest,
    ) -> AuditResult<Vec<AuditEntry>> {
        self.query(AuditFilter::for_entity(entity_type, entity_id), page)
            .await
    }

    /// Everything a single user did
    async fn actor_history(&self, actor_id: i64, page: PageRequest) -> AuditResult<Vec<AuditEntry>> {
        self.query(AuditFilter::for_actor(actor_id), page).await
    }
}
