//! Shared-secret authentication middleware.

use crate::responses::AppError;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use pulse_core::PulseError;
use std::sync::Arc;
use tracing::debug;

/// Authentication middleware state.
#[derive(Clone, Default)]
pub struct AuthMiddlewareState {
    secret: Option<Arc<str>>,
}

impl AuthMiddlewareState {
    /// Requires `Authorization: Bearer <secret>` when `secret` is set.
    /// With `None` every request passes.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret.map(Arc::from),
        }
    }

    /// Is a secret configured.
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    fn accepts(&self, authorization: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return true;
        };
        authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| constant_time_eq(token.as_bytes(), secret.as_bytes()))
    }
}

impl std::fmt::Debug for AuthMiddlewareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddlewareState")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Rejects requests that do not carry the configured bearer secret with 401.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !state.accepts(authorization) {
        debug!(uri = %request.uri(), "Rejected request without a valid bearer secret");
        return Err(PulseError::unauthorized("Missing or invalid bearer token").into());
    }

    Ok(next.run(request).await)
}

/// Compares two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
