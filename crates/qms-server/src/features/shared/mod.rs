//! Shared utilities for feature modules

pub mod nullable;
pub mod validation;

pub use nullable::nullable;
pub use validation::{validate_text, TextValidationError};
