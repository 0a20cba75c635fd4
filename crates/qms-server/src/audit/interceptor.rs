//! Turning domain mutations into audit entries
//!
//! CRUD handlers describe what they changed as a [`Mutation`] and hand it to
//! [`NewAuditEntry::from_mutation`] together with the request's
//! [`AuditContext`]. The snapshot shape each verb needs is encoded in the
//! variant, so a handler cannot record a DELETE with an after-image.

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::context::AuditContext;
use super::error::{AuditError, AuditResult};
use super::models::{AuditAction, AuditVerb, EntityType, NewAuditEntry};

/// Before and after images of a single entity change
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { after: JsonValue },
    Update { before: JsonValue, after: JsonValue },
    Delete { before: JsonValue },
}

impl Mutation {
    pub fn verb(&self) -> AuditVerb {
        match self {
            Self::Create { .. } => AuditVerb::Create,
            Self::Update { .. } => AuditVerb::Update,
            Self::Delete { .. } => AuditVerb::Delete,
        }
    }

    /// Snapshot `after` as a created entity
    pub fn created<T: Serialize>(after: &T) -> AuditResult<Self> {
        Ok(Self::Create {
            after: snapshot(after)?,
        })
    }

    pub fn updated<T: Serialize>(before: &T, after: &T) -> AuditResult<Self> {
        Ok(Self::Update {
            before: snapshot(before)?,
            after: snapshot(after)?,
        })
    }

    pub fn deleted<T: Serialize>(before: &T) -> AuditResult<Self> {
        Ok(Self::Delete {
            before: snapshot(before)?,
        })
    }

    fn into_states(self) -> (Option<JsonValue>, Option<JsonValue>) {
        match self {
            Self::Create { after } => (None, Some(after)),
            Self::Update { before, after } => (Some(before), Some(after)),
            Self::Delete { before } => (Some(before), None),
        }
    }
}

/// Serialize an entity into a JSON object snapshot
///
/// Types that serialize to anything other than an object (scalars, arrays,
/// newtypes) are rejected.
pub fn snapshot<T: Serialize>(entity: &T) -> AuditResult<JsonValue> {
    let value = serde_json::to_value(entity)
        .map_err(|e| AuditError::invalid(format!("entity could not be snapshotted: {}", e)))?;

    if !value.is_object() {
        return Err(AuditError::invalid("entity snapshot must be a JSON object"));
    }

    Ok(value)
}

impl NewAuditEntry {
    /// Audit entry for `mutation` of `entity_type`, attributed to `ctx`
    pub fn from_mutation(
        ctx: &AuditContext,
        entity_type: EntityType,
        entity_id: Option<i64>,
        mutation: Mutation,
    ) -> AuditResult<Self> {
        let action = AuditAction::new(mutation.verb(), entity_type);
        let (old_state, new_state) = mutation.into_states();

        let entry = Self {
            actor_id: ctx.actor_id,
            action,
            entity_type,
            entity_id,
            old_state,
            new_state,
            source_address: ctx.source_address.clone(),
            client_agent: ctx.client_agent.clone(),
        };
        entry.validate()?;

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Capa {
        id: i64,
        title: String,
    }

    #[test]
    fn test_create_mutation_entry() {
        let ctx = AuditContext::new(1).with_source_address("10.1.1.1");
        let capa = Capa {
            id: 42,
            title: "Leak".to_string(),
        };

        let entry = NewAuditEntry::from_mutation(
            &ctx,
            EntityType::Capa,
            Some(capa.id),
            Mutation::created(&capa).unwrap(),
        )
        .unwrap();

        assert_eq!(entry.action.to_string(), "CREATE_CAPA");
        assert_eq!(entry.entity_id, Some(42));
        assert!(entry.old_state.is_none());
        assert_eq!(entry.new_state, Some(json!({"id": 42, "title": "Leak"})));
        assert_eq!(entry.source_address.as_deref(), Some("10.1.1.1"));
    }

    #[test]
    fn test_update_mutation_keeps_both_images() {
        let before = Capa {
            id: 3,
            title: "Old".to_string(),
        };
        let after = Capa {
            id: 3,
            title: "New".to_string(),
        };

        let entry = NewAuditEntry::from_mutation(
            &AuditContext::new(5),
            EntityType::Capa,
            Some(3),
            Mutation::updated(&before, &after).unwrap(),
        )
        .unwrap();

        assert_eq!(entry.action.verb, AuditVerb::Update);
        assert_eq!(entry.old_state.unwrap()["title"], "Old");
        assert_eq!(entry.new_state.unwrap()["title"], "New");
    }

    #[test]
    fn test_delete_requires_entity_id() {
        let result = NewAuditEntry::from_mutation(
            &AuditContext::new(5),
            EntityType::Document,
            None,
            Mutation::Delete {
                before: json!({"name": "SOP-1"}),
            },
        );
        assert!(result.unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_snapshot_rejects_non_objects() {
        assert!(snapshot(&"just a string").is_err());
        assert!(snapshot(&vec![1, 2, 3]).is_err());
        assert!(snapshot(&json!({"ok": true})).is_ok());
    }
}
