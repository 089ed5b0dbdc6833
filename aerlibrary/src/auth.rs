//! Session and authentication collaborator
//!
//! The engine never implements authentication itself; it consumes a session
//! through [`AuthProvider`]. Platform layers back this with their identity
//! service, tests and anonymous deployments use [`StaticAuthProvider`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    /// Authorization role, e.g. `"listener"` or `"curator"`.
    pub role: String,
    pub expires_at: DateTime<Utc>,
    /// Bearer token attached to authenticated requests.
    pub token: String,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Credentials handed to [`AuthProvider::sign_in`].
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Source of the current session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The active, unexpired session, if any.
    async fn current_session(&self) -> Option<Session>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// Exchanges the current session for a fresh one.
    async fn refresh(&self) -> Result<Session>;
}

/// Provider holding a fixed session in memory.
///
/// Covers anonymous operation (no session) and tests; sign-in against a real
/// identity service belongs to the platform layer.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    session: Mutex<Option<Session>>,
}

impl StaticAuthProvider {
    /// Provider with no session; every mutation will be refused downstream.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|session| !session.is_expired())
    }

    async fn sign_in(&self, _credentials: &Credentials) -> Result<Session> {
        self.current_session()
            .await
            .ok_or_else(|| Error::Other("static provider has no session to sign in".into()))
    }

    async fn sign_out(&self) -> Result<()> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(())
    }

    async fn refresh(&self) -> Result<Session> {
        self.current_session().await.ok_or(Error::NoSession)
    }
}
