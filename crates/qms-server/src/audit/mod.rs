//! Audit trail
//!
//! Every create, update and delete of a regulated record produces one
//! immutable [`AuditEntry`] naming who did it, what changed and when. Entries
//! are appended through an [`AuditStore`] and never modified afterwards.
//!
//! # Recording a mutation
//!
//! ```no_run
//! use qms_server::audit::{
//!     AuditContext, AuditStore, EntityType, MemoryAuditStore, Mutation, NewAuditEntry,
//! };
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryAuditStore::new();
//! let ctx = AuditContext::new(1).with_source_address("10.0.0.4");
//!
//! let entry = NewAuditEntry::from_mutation(
//!     &ctx,
//!     EntityType::Capa,
//!     Some(42),
//!     Mutation::Create { after: json!({"title": "Leak"}) },
//! )?;
//! let stored = store.append(entry).await?;
//! println!("audit entry {}", stored.id);
//! # Ok(())
//! # }
//! ```
//!
//! Handlers that write to PostgreSQL open a transaction with
//! [`PostgresAuditStore::begin`] and record through
//! [`PostgresAuditStore::append_in`], so the domain change and its entry
//! commit together.

mod context;
mod error;
mod interceptor;
mod memory;
mod models;
mod postgres;
mod routes;
mod store;

pub use context::{AuditContext, AuditContextRejection, USER_ID_HEADER};
pub use error::{AuditError, AuditResult};
pub use interceptor::{snapshot, Mutation};
pub use memory::MemoryAuditStore;
pub use models::{
    AuditAction, AuditEntry, AuditFilter, AuditQuery, AuditVerb, EntityType, NewAuditEntry,
    NewAuditEntryBuilder, PageRequest, DEFAULT_AUDIT_QUERY_LIMIT, MAX_AUDIT_QUERY_LIMIT,
    MAX_SOURCE_ADDRESS_LEN,
};
pub use postgres::PostgresAuditStore;
pub use routes::{audit_routes, AuditApiState};
pub use store::AuditStore;
