//! Feature modules
//!
//! Each feature is a vertical slice: `commands/` for audited writes,
//! `queries/` for reads and `routes.rs` for the HTTP surface.

pub mod capa;
pub mod shared;
