//! Admin API key authentication

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use super::ApiState;

/// Extract the bearer token from the Authorization header
fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare a presented credential with the configured one
///
/// Runs in time independent of where the inputs first differ.
pub(crate) fn secrets_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    let diff = a
        .iter()
        .zip(b)
        .fold(a.len() ^ b.len(), |acc, (x, y)| acc | usize::from(x ^ y));
    diff == 0
}

/// Admin rejection carrying the bearer challenge
fn unauthorized() -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"autoresponder-admin\""),
    );
    response
}

/// Require the configured admin API key on `/api/admin` routes
///
/// Without a configured key every request passes, which suits a gateway
/// bound to localhost during development.
pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_ref() else {
        tracing::warn!("API key not configured - allowing unauthenticated admin access");
        return next.run(req).await;
    };

    match bearer_token(&req) {
        Some(key) if secrets_match(key, expected.expose_secret()) => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "invalid admin API key");
            unauthorized()
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "no admin API key provided");
            unauthorized()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn test_bearer_token() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&req), None);

        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer admin-key"),
        );
        assert_eq!(bearer_token(&req), Some("admin-key"));

        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("admin-key", "admin-key"));
        assert!(!secrets_match("admin-kez", "admin-key"));
        assert!(!secrets_match("admin", "admin-key"));
        assert!(!secrets_match("admin-key-longer", "admin-key"));
        assert!(!secrets_match("", "admin-key"));
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = unauthorized();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
