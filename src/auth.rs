//! Admin auth gate. Admin routes are only reachable through [`require_admin`].

use crate::error::{AppError, AuthError};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Decides whether a request's credentials admit it to admin routes.
#[async_trait]
pub trait AuthGate: Send + Sync + 'static {
    async fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError>;
}

/// Static bearer token from configuration. Without a token every request is refused.
pub struct BearerTokenGate {
    token: Option<String>,
}

impl BearerTokenGate {
    pub fn new(token: Option<String>) -> Self {
        BearerTokenGate {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

fn bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidCredentials)?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::InvalidCredentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(token.trim())
}

/// Length-independent comparison; does not stop at the first differing byte.
fn same_token(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

#[async_trait]
impl AuthGate for BearerTokenGate {
    async fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let expected = self.token.as_deref().ok_or(AuthError::NotConfigured)?;
        let presented = bearer(headers)?;
        if same_token(presented, expected) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Middleware for `route_layer`: runs the gate, short-circuits with a 401 envelope on refusal.
/// Preflight requests pass through untouched.
pub async fn require_admin(
    State(gate): State<Arc<dyn AuthGate>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }
    match gate.authorize(req.headers()).await {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::warn!(path = %req.uri().path(), method = %req.method(), reason = %e, "admin request rejected");
            AppError::Unauthorized(e).into_response()
        }
    }
}
