//! Request provenance for audit entries

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use super::models::MAX_SOURCE_ADDRESS_LEN;
use crate::api::response::ErrorResponse;
use crate::config::AuditConfig;

/// Header carrying the authenticated user's id, set by the auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Who is acting, and from where
///
/// Extracted from every mutating request. Authentication happens upstream;
/// this only reads the identity the auth layer forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub actor_id: i64,
    pub source_address: Option<String>,
    pub client_agent: Option<String>,
}

impl AuditContext {
    pub fn new(actor_id: i64) -> Self {
        Self {
            actor_id,
            source_address: None,
            client_agent: None,
        }
    }

    pub fn with_source_address(mut self, address: impl Into<String>) -> Self {
        self.source_address = Some(address.into());
        self
    }

    pub fn with_client_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_agent = Some(agent.into());
        self
    }

    /// Build from request headers plus the peer address, if known
    ///
    /// `X-Forwarded-For` is only consulted when `trust_forwarded_for` is set;
    /// otherwise the peer address is recorded.
    pub fn from_headers(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trust_forwarded_for: bool,
    ) -> Result<Self, AuditContextRejection> {
        let raw = headers
            .get(USER_ID_HEADER)
            .ok_or(AuditContextRejection::MissingActor)?;

        let actor_id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or(AuditContextRejection::InvalidActor)?;

        // First hop of X-Forwarded-For is the original client
        let source_address = headers
            .get(FORWARDED_FOR_HEADER)
            .filter(|_| trust_forwarded_for)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s.len() <= MAX_SOURCE_ADDRESS_LEN)
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        let client_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok(Self {
            actor_id,
            source_address,
            client_agent,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
    AuditConfig: FromRef<S>,
{
    type Rejection = AuditContextRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let config = AuditConfig::from_ref(state);

        Self::from_headers(&parts.headers, peer, config.trust_forwarded_for)
    }
}

/// Why an [`AuditContext`] could not be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditContextRejection {
    MissingActor,
    InvalidActor,
}

impl IntoResponse for AuditContextRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingActor => format!("missing {} header", USER_ID_HEADER),
            Self::InvalidActor => format!("{} must be a positive integer", USER_ID_HEADER),
        };

        ErrorResponse::new("UNAUTHORIZED", message).into_response_with(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_extracts_actor_and_provenance() {
        let map = headers(&[
            ("x-user-id", "7"),
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("user-agent", "curl/8.5"),
        ]);

        let ctx = AuditContext::from_headers(&map, None, true).unwrap();
        assert_eq!(ctx.actor_id, 7);
        assert_eq!(ctx.source_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(ctx.client_agent.as_deref(), Some("curl/8.5"));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let map = headers(&[("x-user-id", "1")]);
        let peer: SocketAddr = "192.168.1.20:5123".parse().unwrap();

        let ctx = AuditContext::from_headers(&map, Some(peer), true).unwrap();
        assert_eq!(ctx.source_address.as_deref(), Some("192.168.1.20"));
        assert!(ctx.client_agent.is_none());
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let map = headers(&[("x-user-id", "7"), ("x-forwarded-for", "198.51.100.66")]);
        let peer: SocketAddr = "10.0.0.8:40000".parse().unwrap();

        let ctx = AuditContext::from_headers(&map, Some(peer), false).unwrap();
        assert_eq!(ctx.source_address.as_deref(), Some("10.0.0.8"));

        let ctx = AuditContext::from_headers(&map, None, false).unwrap();
        assert!(ctx.source_address.is_none());

        let ctx = AuditContext::from_headers(&map, Some(peer), true).unwrap();
        assert_eq!(ctx.source_address.as_deref(), Some("198.51.100.66"));
    }

    #[test]
    fn test_rejects_missing_or_bad_actor() {
        assert_eq!(
            AuditContext::from_headers(&HeaderMap::new(), None, false),
            Err(AuditContextRejection::MissingActor)
        );
        assert_eq!(
            AuditContext::from_headers(&headers(&[("x-user-id", "abc")]), None, false),
            Err(AuditContextRejection::InvalidActor)
        );
        assert_eq!(
            AuditContext::from_headers(&headers(&[("x-user-id", "0")]), None, false),
            Err(AuditContextRejection::InvalidActor)
        );
    }

    #[test]
    fn test_rejection_is_unauthorized() {
        let response = AuditContextRejection::MissingActor.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
