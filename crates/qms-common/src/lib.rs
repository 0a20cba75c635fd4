//! QMS Common Library
//!
//! Shared infrastructure for the QMS workspace members. Currently this is the
//! logging setup used by every binary so that log output, rotation and
//! filtering behave the same everywhere.
//!
//! # Example
//!
//! ```no_run
//! use qms_common::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("logging");
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod logging;

pub use logging::{init_logging, LogConfig, LogGuard};
