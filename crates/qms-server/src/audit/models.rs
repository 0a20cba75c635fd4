//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use super::error::{AuditError, AuditResult};

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Default number of audit entries returned per query
pub const DEFAULT_AUDIT_QUERY_LIMIT: i64 = 100;

/// Maximum number of audit entries that can be returned in a single query.
/// Larger limits are clamped, not rejected.
pub const MAX_AUDIT_QUERY_LIMIT: i64 = 1000;

/// Longest accepted `source_address` (fits an IPv6 address with zone id)
pub const MAX_SOURCE_ADDRESS_LEN: usize = 64;

/// What was done to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditVerb {
    Create,
    Update,
    Delete,
}

impl AuditVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditVerb {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(AuditError::invalid(format!("unknown audit verb '{}'", other))),
        }
    }
}

/// Domain entities whose mutations are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Capa,
    Document,
    ElectronicSignature,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capa => "CAPA",
            Self::Document => "DOCUMENT",
            Self::ElectronicSignature => "ELECTRONIC_SIGNATURE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAPA" => Ok(Self::Capa),
            "DOCUMENT" => Ok(Self::Document),
            "ELECTRONIC_SIGNATURE" => Ok(Self::ElectronicSignature),
            other => Err(AuditError::invalid(format!("unknown entity type '{}'", other))),
        }
    }
}

/// `{VERB}_{ENTITY_TYPE}` action tag, e.g. `CREATE_CAPA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuditAction {
    pub verb: AuditVerb,
    pub entity_type: EntityType,
}

impl AuditAction {
    pub const fn new(verb: AuditVerb, entity_type: EntityType) -> Self {
        Self { verb, entity_type }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.verb, self.entity_type)
    }
}

impl FromStr for AuditAction {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, entity) = s
            .split_once('_')
            .ok_or_else(|| AuditError::invalid(format!("action '{}' is not VERB_ENTITY", s)))?;
        Ok(Self::new(verb.parse()?, entity.parse()?))
    }
}

impl TryFrom<String> for AuditAction {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.to_string()
    }
}

/// An appended, immutable audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Store-assigned, strictly increasing identifier
    pub id: i64,
    /// Store clock at append time
    pub timestamp: DateTime<Utc>,
    pub actor_id: i64,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    /// Entity fields before the change (UPDATE, DELETE)
    pub old_state: Option<JsonValue>,
    /// Entity fields after the change (CREATE, UPDATE)
    pub new_state: Option<JsonValue>,
    pub source_address: Option<String>,
    pub client_agent: Option<String>,
}

/// Input for appending an audit entry
///
/// Stores call [`NewAuditEntry::validate`] before persisting, so an entry
/// assembled by hand is held to the same rules as one from the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub actor_id: i64,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub old_state: Option<JsonValue>,
    pub new_state: Option<JsonValue>,
    pub source_address: Option<String>,
    pub client_agent: Option<String>,
}

impl NewAuditEntry {
    pub fn builder() -> NewAuditEntryBuilder {
        NewAuditEntryBuilder::default()
    }

    /// Check required fields and the snapshot shape for the action's verb
    ///
    /// | verb   | old_state | new_state | entity_id |
    /// |--------|-----------|-----------|-----------|
    /// | CREATE | absent    | present   | optional  |
    /// | UPDATE | present   | present   | required  |
    /// | DELETE | present   | absent    | required  |
    pub fn validate(&self) -> AuditResult<()> {
        if self.actor_id <= 0 {
            return Err(AuditError::invalid("actor_id must be a positive user id"));
        }

        if self.entity_type != self.action.entity_type {
            return Err(AuditError::invalid(format!(
                "action {} does not apply to entity type {}",
                self.action, self.entity_type
            )));
        }

        let verb = self.action.verb;
        let (needs_old, needs_new) = match verb {
            AuditVerb::Create => (false, true),
            AuditVerb::Update => (true, true),
            AuditVerb::Delete => (true, false),
        };

        check_snapshot("old_state", verb, needs_old, self.old_state.as_ref())?;
        check_snapshot("new_state", verb, needs_new, self.new_state.as_ref())?;

        if verb != AuditVerb::Create && self.entity_id.is_none() {
            return Err(AuditError::invalid(format!(
                "{} entries must identify the affected entity",
                verb
            )));
        }

        if let Some(ref address) = self.source_address {
            if address.len() > MAX_SOURCE_ADDRESS_LEN {
                return Err(AuditError::invalid(format!(
                    "source_address exceeds {} characters",
                    MAX_SOURCE_ADDRESS_LEN
                )));
            }
        }

        Ok(())
    }
}

fn check_snapshot(
    field: &str,
    verb: AuditVerb,
    required: bool,
    snapshot: Option<&JsonValue>,
) -> AuditResult<()> {
    match (required, snapshot) {
        (true, None) => Err(AuditError::invalid(format!("{} entries require {}", verb, field))),
        (false, Some(_)) => Err(AuditError::invalid(format!("{} entries must not carry {}", verb, field))),
        (true, Some(value)) if !value.is_object() => {
            Err(AuditError::invalid(format!("{} must be a JSON object", field)))
        },
        _ => Ok(()),
    }
}

/// Builder for [`NewAuditEntry`]
///
/// `entity_type` defaults to the action's entity type.
#[derive(Debug, Clone, Default)]
pub struct NewAuditEntryBuilder {
    actor_id: Option<i64>,
    action: Option<AuditAction>,
    entity_type: Option<EntityType>,
    entity_id: Option<i64>,
    old_state: Option<JsonValue>,
    new_state: Option<JsonValue>,
    source_address: Option<String>,
    client_agent: Option<String>,
}

impl NewAuditEntryBuilder {
    pub fn actor_id(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn entity_id(mut self, entity_id: i64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn old_state(mut self, old_state: JsonValue) -> Self {
        self.old_state = Some(old_state);
        self
    }

    pub fn new_state(mut self, new_state: JsonValue) -> Self {
        self.new_state = Some(new_state);
        self
    }

    pub fn source_address(mut self, source_address: impl Into<String>) -> Self {
        self.source_address = Some(source_address.into());
        self
    }

    pub fn client_agent(mut self, client_agent: impl Into<String>) -> Self {
        self.client_agent = Some(client_agent.into());
        self
    }

    /// Build and validate the entry
    pub fn build(self) -> AuditResult<NewAuditEntry> {
        let actor_id = self
            .actor_id
            .ok_or_else(|| AuditError::invalid("actor_id is required"))?;
        let action = self
            .action
            .ok_or_else(|| AuditError::invalid("action is required"))?;

        let entry = NewAuditEntry {
            actor_id,
            action,
            entity_type: self.entity_type.unwrap_or(action.entity_type),
            entity_id: self.entity_id,
            old_state: self.old_state,
            new_state: self.new_state,
            source_address: self.source_address,
            client_agent: self.client_agent,
        };
        entry.validate()?;

        Ok(entry)
    }
}

/// Conditions an entry must meet to be returned by a query
///
/// All set fields must match; unset fields impose no restriction. The time
/// range is inclusive at both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn for_entity(entity_type: EntityType, entity_id: i64) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }

    pub fn for_actor(actor_id: i64) -> Self {
        Self {
            actor_id: Some(actor_id),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> AuditResult<()> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(AuditError::invalid("start_time must not be after end_time"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.map_or(true, |t| entry.entity_type == t)
            && self.entity_id.map_or(true, |id| entry.entity_id == Some(id))
            && self.actor_id.map_or(true, |id| entry.actor_id == id)
            && self.action.map_or(true, |a| entry.action == a)
            && self.start_time.map_or(true, |start| entry.timestamp >= start)
            && self.end_time.map_or(true, |end| entry.timestamp <= end)
    }
}

/// Offset pagination over the newest-first ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    skip: i64,
    limit: i64,
}

impl PageRequest {
    /// Validate `skip >= 0` and `limit > 0`; limits above
    /// [`MAX_AUDIT_QUERY_LIMIT`] are clamped.
    pub fn new(skip: i64, limit: i64) -> AuditResult<Self> {
        Self::bounded(skip, limit, MAX_AUDIT_QUERY_LIMIT)
    }

    /// Like [`PageRequest::new`] with a tighter, deployment-specific cap
    pub fn bounded(skip: i64, limit: i64, max_limit: i64) -> AuditResult<Self> {
        if skip < 0 {
            return Err(AuditError::invalid(format!("skip must be >= 0, got {}", skip)));
        }
        if limit <= 0 {
            return Err(AuditError::invalid(format!("limit must be > 0, got {}", limit)));
        }

        let cap = max_limit.clamp(1, MAX_AUDIT_QUERY_LIMIT);
        Ok(Self {
            skip,
            limit: limit.min(cap),
        })
    }

    pub fn skip(&self) -> i64 {
        self.skip
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_AUDIT_QUERY_LIMIT,
        }
    }
}

/// Query-string parameters for audit log queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditQuery {
    /// Split into a validated filter and page using the built-in limits
    pub fn into_parts(self) -> AuditResult<(AuditFilter, PageRequest)> {
        self.into_parts_with(DEFAULT_AUDIT_QUERY_LIMIT, MAX_AUDIT_QUERY_LIMIT)
    }

    pub fn into_parts_with(
        self,
        default_limit: i64,
        max_limit: i64,
    ) -> AuditResult<(AuditFilter, PageRequest)> {
        let page = PageRequest::bounded(
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(default_limit),
            max_limit,
        )?;
        let filter = AuditFilter {
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            actor_id: self.actor_id,
            action: self.action,
            start_time: self.start_time,
            end_time: self.end_time,
        };
        filter.validate()?;

        Ok((filter, page))
    }
}
