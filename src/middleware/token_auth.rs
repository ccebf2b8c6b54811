//! Static API token middleware.
//!
//! When AUTH_TOKEN is configured, mutating requests require
//! `Authorization: Bearer {token}`; safe methods (reads and downloads)
//! stay public so shared links keep working. With no token configured
//! the instance is open, which suits single-user deployments behind a
//! private network.

use axum::{
    body::Body,
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::Error;

/// Extract a bearer token from the Authorization header.
fn extract_bearer(req: &Request<Body>) -> Option<String> {
    let auth_header = req.headers().get(AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::to_string)
}

/// Middleware that requires the configured static token on mutating
/// requests, when one is set.
pub async fn require_token(req: Request<Body>, next: Next) -> Result<Response, Error> {
    if req.method().is_safe() {
        return Ok(next.run(req).await);
    }

    let expected = match &crate::config().auth.token {
        Some(token) => token,
        None => return Ok(next.run(req).await),
    };

    let provided = extract_bearer(&req).ok_or(Error::Unauthenticated)?;

    if !constant_time_eq(&provided, expected) {
        return Err(Error::InvalidToken);
    }

    Ok(next.run(req).await)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
