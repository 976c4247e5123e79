//! Purpose: Satisfy auth call sites with one fixed, always-signed-in identity.
//! Exports: `AuthApi`, `User`, `Session`, `AuthEvent`, `AuthSubscription`.
//! Role: Constant-response stand-in; no credential checking, no state transitions.
//! Invariants: Every retrieval resolves to the same session the client was built with.
//! Invariants: The state-change callback fires exactly one deferred `SignedIn` event.

use serde::{Deserialize, Serialize};

use crate::core::defer;
use crate::core::error::Error;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: "authenticated".to_string(),
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new("local-user", "local-user@example.test")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub token_type: String,
}

impl Session {
    pub fn for_user(user: User) -> Self {
        Self {
            user,
            access_token: "understudy-access-token".to_string(),
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

#[derive(Clone, Debug)]
pub struct AuthApi {
    session: Session,
}

impl AuthApi {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn get_user(&self) -> Result<User, Error> {
        defer().await;
        Ok(self.session.user.clone())
    }

    pub async fn get_session(&self) -> Result<Session, Error> {
        defer().await;
        Ok(self.session.clone())
    }

    /// Register a state-change listener. The fixture has no transitions to
    /// report, so the listener receives a single deferred `SignedIn` carrying
    /// the fixed session, matching what call sites see on page load against
    /// the real service.
    pub fn on_auth_state_change(
        &self,
        callback: impl FnOnce(AuthEvent, Option<Session>) + Send + 'static,
    ) -> AuthSubscription {
        let session = self.session.clone();
        tracing::debug!(user = %session.user.id, "auth state listener registered");
        tokio::spawn(async move {
            defer().await;
            callback(AuthEvent::SignedIn, Some(session));
        });
        AuthSubscription { active: true }
    }

    /// Always succeeds and changes nothing; the fixed identity stays signed in.
    pub async fn sign_out(&self) -> Result<(), Error> {
        defer().await;
        tracing::debug!(user = %self.session.user.id, "sign_out (no-op)");
        Ok(())
    }
}

#[derive(Debug)]
pub struct AuthSubscription {
    active: bool,
}

impl AuthSubscription {
    pub fn unsubscribe(mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
