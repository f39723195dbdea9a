//! Admin authentication
//!
//! This module provides:
//! - The identity provider abstraction (sign up, sign in, sign out)
//! - A Firebase Identity Toolkit client and an in-memory provider
//! - `AuthService`, which tracks active sessions and notifies observers

mod firebase;
mod memory;
mod service;

pub use firebase::FirebaseIdentityProvider;
pub use memory::InMemoryIdentityProvider;
pub use service::{AuthService, ObserverId, SessionEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated admin session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token presented on later requests
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub signed_in_at: DateTime<Utc>,
    /// When the provider stops honouring the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Errors returned by identity providers
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Session not found or expired")]
    UnknownSession,

    #[error("Authentication is not configured")]
    Disabled,

    #[error("Identity provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

/// Trait for an external identity provider
pub trait IdentityProvider: Send + Sync {
    /// Register an account and sign it in
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError>;

    /// Sign in with email and password
    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// End a session on the provider side
    fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Minimum password length accepted by the providers
pub(crate) const MIN_PASSWORD_LEN: usize = 6;

/// Reject blank credentials before calling a provider
pub(crate) fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}
