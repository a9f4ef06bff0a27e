//! HTTP Basic authentication in front of the artifact handler
//!
//! Supplied and configured credentials are both reduced to SHA-256 digests
//! and compared in constant time, so neither the length nor the content of
//! the configured secret influences how long a rejection takes.

use crate::config::Credentials;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::sync::Arc;

type CredentialHash = [u8; 32];

/// Pre-hashed expected credentials
#[derive(Clone)]
pub struct BasicAuth {
    username_hash: CredentialHash,
    password_hash: CredentialHash,
}

impl BasicAuth {
    /// Returns `None` when the gate is disabled (both values empty).
    pub fn from_credentials(credentials: &Credentials) -> Option<Self> {
        if !credentials.is_enabled() {
            return None;
        }

        Some(Self {
            username_hash: hash(credentials.username.as_bytes()),
            password_hash: hash(credentials.password.as_bytes()),
        })
    }

    pub fn verify(&self, username: &[u8], password: &[u8]) -> bool {
        let username_match = constant_time_eq(&hash(username), &self.username_hash);
        let password_match = constant_time_eq(&hash(password), &self.password_hash);

        // Non-short-circuiting so both comparisons always run
        username_match & password_match
    }

    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        match basic_credentials(headers) {
            Some((username, password)) => self.verify(&username, &password),
            None => false,
        }
    }
}

/// Extracts the raw user/password bytes from an `Authorization: Basic ...`
/// header. The scheme is case-insensitive; the payload must be padded
/// base64 and contain a `:`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(Vec<u8>, Vec<u8>)> {
    const PREFIX: &str = "basic ";

    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    if value.len() < PREFIX.len() || !value[..PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
        return None;
    }

    let decoded = STANDARD.decode(&value[PREFIX.len()..]).ok()?;
    let split = decoded.iter().position(|b| *b == b':')?;

    Some((decoded[..split].to_vec(), decoded[split + 1..].to_vec()))
}

fn hash(value: &[u8]) -> CredentialHash {
    Sha256::digest(value).into()
}

/// XOR-accumulates every byte; no early exit on the first difference.
fn constant_time_eq(a: &CredentialHash, b: &CredentialHash) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests whose Basic credentials do not match.
pub async fn require_basic_auth(
    State(gate): State<Arc<BasicAuth>>,
    request: Request,
    next: Next,
) -> Response {
    if gate.authorize(request.headers()) {
        return next.run(request).await;
    }

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "rejected unauthenticated request"
    );
    StatusCode::UNAUTHORIZED.into_response()
}
