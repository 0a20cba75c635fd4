//! PostgreSQL audit store and CAPA handler tests.
//!
//! These need a reachable server in `DATABASE_URL`; run them with
//! `cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use qms_server::api::{create_router, AppState};
use qms_server::audit::{
    AuditAction, AuditContext, AuditError, AuditFilter, AuditStore, AuditVerb, EntityType,
    NewAuditEntry, PageRequest, PostgresAuditStore,
};
use qms_server::config::AuditConfig;
use qms_server::features::capa::{
    commands::{create, delete, update},
    CapaStatus, CapaType, CreateCapaCommand, DeleteCapaCommand, DeleteCapaError,
    UpdateCapaCommand,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

fn create_capa_entry(actor_id: i64, entity_id: i64) -> NewAuditEntry {
    NewAuditEntry::builder()
        .actor_id(actor_id)
        .action(AuditAction::new(AuditVerb::Create, EntityType::Capa))
        .entity_id(entity_id)
        .new_state(json!({"title": "Leak", "entity": entity_id}))
        .source_address("10.0.0.4")
        .build()
        .unwrap()
}

fn create_command() -> CreateCapaCommand {
    CreateCapaCommand {
        title: "Coolant leak".to_string(),
        description: "Coolant pooling under press 3B".to_string(),
        capa_type: CapaType::Corrective,
        root_cause: None,
        immediate_action: Some("Line stopped".to_string()),
        corrective_action: None,
        preventive_action: None,
        due_date: None,
        assignee_id: 4,
    }
}

async fn capa_trail(pool: &PgPool, id: i64) -> Vec<qms_server::audit::AuditEntry> {
    PostgresAuditStore::new(pool.clone())
        .entity_trail(EntityType::Capa, id, PageRequest::default())
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_append_and_query(pool: PgPool) -> sqlx::Result<()> {
    let store = PostgresAuditStore::new(pool);

    let first = store.append(create_capa_entry(1, 42)).await.unwrap();
    let second = store.append(create_capa_entry(2, 43)).await.unwrap();

    assert!(second.id > first.id);
    assert!(second.timestamp >= first.timestamp);
    assert_eq!(first.new_state, Some(json!({"title": "Leak", "entity": 42})));
    assert_eq!(first.source_address.as_deref(), Some("10.0.0.4"));

    let all = store
        .query(AuditFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second.id, first.id]);

    let trail = store
        .entity_trail(EntityType::Capa, 42, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(trail, vec![first]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_pagination(pool: PgPool) -> sqlx::Result<()> {
    let store = PostgresAuditStore::new(pool);
    for n in 1..=150 {
        store.append(create_capa_entry(7, n)).await.unwrap();
    }

    let filter = AuditFilter::for_actor(7);
    let first = store
        .query(filter.clone(), PageRequest::new(0, 100).unwrap())
        .await
        .unwrap();
    let second = store
        .query(filter, PageRequest::new(100, 100).unwrap())
        .await
        .unwrap();

    assert_eq!(first.len(), 100);
    assert_eq!(second.len(), 50);
    assert!(first.last().unwrap().id > second.first().unwrap().id);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_entries_cannot_be_changed(pool: PgPool) -> sqlx::Result<()> {
    let store = PostgresAuditStore::new(pool.clone());
    let entry = store.append(create_capa_entry(1, 1)).await.unwrap();

    let update = sqlx::query("UPDATE audit_log SET actor_id = 99 WHERE id = $1")
        .bind(entry.id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM audit_log WHERE id = $1")
        .bind(entry.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());

    let stored = store
        .query(AuditFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(stored, vec![entry]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_rolled_back_transaction_leaves_no_entry(pool: PgPool) -> sqlx::Result<()> {
    let store = PostgresAuditStore::new(pool);
    let mut tx = store.begin().await?;
    store
        .append_in(&mut tx, &create_capa_entry(1, 5))
        .await
        .unwrap();
    tx.rollback().await?;

    let records = store
        .query(AuditFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert!(records.is_empty());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_unknown_action_row_is_corrupt(pool: PgPool) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO audit_log (actor_id, action, entity_type, entity_id, new_state) \
         VALUES (1, 'ARCHIVE_CAPA', 'CAPA', 1, '{}'::jsonb)",
    )
    .execute(&pool)
    .await?;

    let err = PostgresAuditStore::new(pool)
        .query(AuditFilter::default(), PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::CorruptEntry { .. }));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_capa_lifecycle_is_audited(pool: PgPool) -> sqlx::Result<()> {
    let ctx = AuditContext::new(3).with_client_agent("qms-tests");
    let audit = PostgresAuditStore::new(pool.clone());

    let capa = create::handle(&audit, &ctx, create_command()).await.unwrap();
    assert_eq!(capa.status, CapaStatus::Draft);

    let closed = update::handle(
        &audit,
        &ctx,
        UpdateCapaCommand {
            id: capa.id,
            status: Some(CapaStatus::Closed),
            corrective_action: Some(Some("Seal replaced".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(closed.closed_date.is_some());

    let cleared = update::handle(
        &audit,
        &ctx,
        UpdateCapaCommand {
            id: capa.id,
            immediate_action: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cleared.immediate_action, None);

    delete::handle(&audit, &ctx, DeleteCapaCommand { id: capa.id })
        .await
        .unwrap();

    let trail = capa_trail(&pool, capa.id).await;
    let actions: Vec<String> = trail.iter().map(|e| e.action.to_string()).collect();
    assert_eq!(
        actions,
        vec!["DELETE_CAPA", "UPDATE_CAPA", "UPDATE_CAPA", "CREATE_CAPA"]
    );
    assert_eq!(
        trail[1].old_state.as_ref().unwrap()["immediate_action"],
        "Line stopped"
    );
    assert_eq!(trail[1].new_state.as_ref().unwrap()["immediate_action"], Value::Null);

    let update_entry = &trail[2];
    assert_eq!(update_entry.old_state.as_ref().unwrap()["status"], "draft");
    assert_eq!(update_entry.new_state.as_ref().unwrap()["status"], "closed");
    assert!(trail.iter().all(|e| e.actor_id == 3));
    assert_eq!(trail[0].new_state, None);
    assert_eq!(trail[0].old_state.as_ref().unwrap()["title"], "Coolant leak");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_missing_capa_is_not_audited(pool: PgPool) -> sqlx::Result<()> {
    let ctx = AuditContext::new(3);
    let audit = PostgresAuditStore::new(pool.clone());

    let err = delete::handle(&audit, &ctx, DeleteCapaCommand { id: 999 })
        .await
        .unwrap_err();
    assert!(matches!(err, DeleteCapaError::NotFound(999)));

    assert!(capa_trail(&pool, 999).await.is_empty());
    Ok(())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_created_capa_is_visible_through_audit_api(pool: PgPool) -> sqlx::Result<()> {
    let app = create_router(AppState::new(pool, AuditConfig::default()));

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/capas")
        .header("content-type", "application/json")
        .header("x-user-id", "5")
        .body(Body::from(
            json!({
                "title": "Coolant leak",
                "description": "  Coolant pooling under press 3B  ",
                "capa_type": "corrective",
                "assignee_id": 2
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, create).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["description"], "Coolant pooling under press 3B");
    let capa_id = body["data"]["id"].as_i64().unwrap();

    let query = Request::builder()
        .uri(format!(
            "/api/v1/audit?entity_type=CAPA&entity_id={}&action=CREATE_CAPA",
            capa_id
        ))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, query).await;
    assert_eq!(status, StatusCode::OK);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["actor_id"], 5);
    assert_eq!(data[0]["entity_id"], capa_id);
    assert_eq!(data[0]["new_state"]["title"], "Coolant leak");

    let trail = Request::builder()
        .uri(format!("/api/v1/audit/CAPA/{}", capa_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, trail).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    Ok(())
}
