//! CAPA record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum title length, in characters
pub const TITLE_MIN_LEN: usize = 3;
/// Maximum title length, in characters
pub const TITLE_MAX_LEN: usize = 200;
/// Minimum description length, in characters
pub const DESCRIPTION_MIN_LEN: usize = 10;

/// Columns selected for every CAPA read, in `Capa` field order
pub(crate) const CAPA_COLUMNS: &str = "id, title, description, capa_type, status, \
     root_cause, immediate_action, corrective_action, preventive_action, \
     assignee_id, due_date, closed_date, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "capa_type", rename_all = "snake_case")]
pub enum CapaType {
    Corrective,
    Preventive,
}

/// Workflow state of a CAPA
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "capa_status", rename_all = "snake_case")]
pub enum CapaStatus {
    #[default]
    Draft,
    Open,
    InProgress,
    PendingReview,
    Closed,
}

impl CapaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::PendingReview => "pending_review",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for CapaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted CAPA record
///
/// This is also the shape recorded in audit snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Capa {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub capa_type: CapaType,
    pub status: CapaStatus,
    pub root_cause: Option<String>,
    pub immediate_action: Option<String>,
    pub corrective_action: Option<String>,
    pub preventive_action: Option<String>,
    pub assignee_id: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub closed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `closed_date` after moving from `from` to `to`
///
/// Entering `closed` stamps `now`; leaving it clears the date; any other
/// transition keeps `current`.
pub fn closed_date_after(
    from: CapaStatus,
    to: CapaStatus,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (from, to) {
        (CapaStatus::Closed, CapaStatus::Closed) => current,
        (_, CapaStatus::Closed) => Some(now),
        (CapaStatus::Closed, _) => None,
        _ => current,
    }
}
