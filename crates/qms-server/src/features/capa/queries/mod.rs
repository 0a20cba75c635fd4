pub mod get;
pub mod list;

pub use get::{GetCapaError, GetCapaQuery};
pub use list::{ListCapasError, ListCapasQuery, ListCapasResponse};
