//! QMS Audit Trail Server
//!
//! REST API for CAPA (Corrective and Preventive Action) records in which
//! every create, update and delete leaves an immutable audit entry naming
//! the actor, the action, and the entity state before and after.
//!
//! # Layout
//!
//! - [`audit`]: the audit store trait, its PostgreSQL and in-memory
//!   implementations, the request context extractor and the `/audit` routes
//! - [`features`]: domain slices (commands, queries, routes); CAPA today
//! - [`api`]: shared state, router assembly and the serve loop
//! - [`config`], [`db`], [`middleware`]: the usual plumbing
//!
//! Writes (POST, PUT, DELETE) are audited inside the same database
//! transaction as the change they describe. Reads are not audited.
//!
//! # Example
//!
//! ```no_run
//! use qms_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     api::serve(&config, api::AppState::new(pool, config.audit)).await?;
//!     Ok(())
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

pub use error::{ServerError, ServerResult};
