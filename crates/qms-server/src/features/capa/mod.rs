//! CAPA (Corrective and Preventive Action) records
//!
//! Every mutation here goes through the audit trail: the domain write and its
//! audit entry share one transaction.

pub mod commands;
pub mod models;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateCapaCommand, CreateCapaError, DeleteCapaCommand, DeleteCapaError, DeleteCapaResponse,
    UpdateCapaCommand, UpdateCapaError,
};
pub use models::{Capa, CapaStatus, CapaType};
pub use queries::{GetCapaError, GetCapaQuery, ListCapasError, ListCapasQuery, ListCapasResponse};
pub use routes::capa_routes;
