pub mod create;
pub mod delete;
pub mod update;

pub use create::{CreateCapaCommand, CreateCapaError};
pub use delete::{DeleteCapaCommand, DeleteCapaError, DeleteCapaResponse};
pub use update::{UpdateCapaCommand, UpdateCapaError};
