//! In-process audit store
//!
//! Used by tests and by deployments that only need an audit trail for the
//! lifetime of the process. Entries are never evicted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::AuditResult;
use super::models::{AuditEntry, AuditFilter, NewAuditEntry, PageRequest};
use super::store::AuditStore;

#[derive(Debug)]
struct Ledger {
    entries: Vec<Arc<AuditEntry>>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// [`AuditStore`] backed by a `Vec` guarded by an async `RwLock`
///
/// Id assignment and the push happen under one write guard with no await in
/// between, so a cancelled append either records the entry or does nothing.
/// Queries hold the read guard only while copying entry pointers; filtering
/// and cloning happen after it is released.
#[derive(Debug)]
pub struct MemoryAuditStore {
    ledger: RwLock<Ledger>,
    clock: fn() -> DateTime<Utc>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Store that stamps entries with `clock` instead of the system time
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            ledger: RwLock::new(Ledger {
                entries: Vec::new(),
                next_id: 1,
                last_timestamp: None,
            }),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.ledger.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledger.read().await.entries.is_empty()
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> AuditResult<AuditEntry> {
        entry.validate()?;

        let mut ledger = self.ledger.write().await;

        // The wall clock can step backwards; entry order must not.
        let now = (self.clock)();
        let timestamp = match ledger.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let stored = AuditEntry {
            id: ledger.next_id,
            timestamp,
            actor_id: entry.actor_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            old_state: entry.old_state,
            new_state: entry.new_state,
            source_address: entry.source_address,
            client_agent: entry.client_agent,
        };

        ledger.next_id += 1;
        ledger.last_timestamp = Some(timestamp);
        ledger.entries.push(Arc::new(stored.clone()));

        debug!(
            audit_id = stored.id,
            action = %stored.action,
            entity_id = ?stored.entity_id,
            "Appended audit entry"
        );

        Ok(stored)
    }

    async fn query(&self, filter: AuditFilter, page: PageRequest) -> AuditResult<Vec<AuditEntry>> {
        filter.validate()?;

        let snapshot: Vec<Arc<AuditEntry>> = self.ledger.read().await.entries.clone();

        // Append order is (timestamp asc, id asc), so reversing gives newest first.
        let records: Vec<AuditEntry> = snapshot
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .skip(page.skip() as usize)
            .take(page.limit() as usize)
            .map(|entry| AuditEntry::clone(entry))
            .collect();

        debug!(count = records.len(), "Queried audit entries");

        Ok(records)
    }
}
