//! Identity context plumbing.
//!
//! A session token arrives as the `sid` cookie (or a bearer token for
//! non-browser clients), is resolved against the session store, and the
//! resulting identity rides the request as an extension. Session creation
//! and credential checking belong to the external auth service; this module
//! only resolves tokens it is handed.

use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;

use crate::api::AppState;
use crate::models::Identity;

pub const SESSION_COOKIE: &str = "sid";

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve a session token to the identity it was issued for.
    async fn resolve(&self, token: &str) -> Option<Identity>;
}

/// In-memory token-to-identity map.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Identity>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.sessions.write().await.insert(token.into(), identity);
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        self.sessions.read().await.get(token).copied()
    }
}

/// The caller's identity context: present when a valid session token was
/// supplied, absent otherwise. Whether absence matters is the access
/// policy's call, not this extractor's.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        Ok(parts.extensions.get::<Caller>().copied().unwrap_or_default())
    }
}

/// Middleware: resolve the session token (if any) and attach the identity
/// context to the request.
pub async fn identity_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match session_token(&request) {
        Some(token) => state.sessions.resolve(&token).await,
        None => None,
    };
    request.extensions_mut().insert(Caller(identity));
    next.run(request).await
}

fn session_token(request: &Request) -> Option<String> {
    let headers = request.headers();
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookies.split(';') {
            let value = pair
                .trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='));
            if let Some(value) = value {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
