//! HTTP surface: shared state, router assembly and the serve loop

pub mod response;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal, sync::Notify};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

use crate::audit::{audit_routes, AuditApiState, PostgresAuditStore};
use crate::config::{AuditConfig, Config};
use crate::db;
use crate::error::{ServerError, ServerResult};
use crate::features::capa::capa_routes;
use crate::middleware;
use response::ErrorResponse;

/// State shared by every handler
///
/// CAPA writes and audit reads go through one [`PostgresAuditStore`] built
/// from the pool, so the audit API always serves the ledger the CAPA
/// commands record into.
#[derive(Clone)]
pub struct AppState {
    audit: PostgresAuditStore,
    audit_config: AuditConfig,
}

impl AppState {
    pub fn new(db: PgPool, audit_config: AuditConfig) -> Self {
        Self {
            audit: PostgresAuditStore::new(db),
            audit_config,
        }
    }

    pub fn db(&self) -> &PgPool {
        self.audit.pool()
    }

    pub fn audit(&self) -> &PostgresAuditStore {
        &self.audit
    }
}

impl FromRef<AppState> for AuditConfig {
    fn from_ref(state: &AppState) -> Self {
        state.audit_config
    }
}

impl FromRef<AppState> for AuditApiState {
    fn from_ref(state: &AppState) -> Self {
        AuditApiState::new(Arc::new(state.audit.clone()), state.audit_config)
    }
}

/// Build the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let api_v1 = Router::new()
        .nest("/audit", audit_routes())
        .nest("/capas", capa_routes());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::tracing_layer())
                .layer(CompressionLayer::new()),
        )
}

/// Bind, serve until a shutdown signal, then drain for at most
/// `server.shutdown_timeout_secs` and close the pool
pub async fn serve(config: &Config, state: AppState) -> ServerResult<()> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|_| ServerError::Address(config.bind_address()))?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    let pool = state.db().clone();
    let app = create_router(state);

    let signalled = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(signalled.clone()))
    .into_future();

    let drain_limit = Duration::from_secs(config.server.shutdown_timeout_secs);
    let deadline = async {
        signalled.notified().await;
        tokio::time::sleep(drain_limit).await;
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Connections still open after shutdown timeout, stopping anyway"
            );
        },
    }

    pool.close().await;
    info!("Server shut down gracefully");

    Ok(())
}

async fn shutdown_signal(signalled: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    signalled.notify_one();
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "QMS Audit Trail Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match db::health_check(state.db()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            ErrorResponse::new("UNAVAILABLE", "Database is not reachable")
                .into_response_with(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
