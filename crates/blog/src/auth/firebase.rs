//! Firebase Authentication via the Identity Toolkit REST API
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::time::Duration;

use anyhow::Context;
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{AuthError, IdentityProvider, Session, check_credentials};

/// Successful sign-up / sign-in response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    local_id: String,
    email: String,
    display_name: Option<String>,
    /// Token lifetime in seconds, sent as a string
    expires_in: Option<String>,
}

/// Response from `accounts:update`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity provider backed by a Firebase project
pub struct FirebaseIdentityProvider {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl FirebaseIdentityProvider {
    /// Identity Toolkit API base URL
    const BASE_URL: &'static str = "https://identitytoolkit.googleapis.com/v1";

    /// Create a provider for the project owning `api_key`
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        // Error bodies carry the failure reason, so read them instead of failing on status
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_key: api_key.into(),
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (e.g. the auth emulator)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.base_url,
            method,
            urlencoding::encode(&self.api_key)
        )
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthError> {
        let mut response = self
            .agent
            .post(&self.endpoint(method))
            .send_json(&body)
            .with_context(|| format!("Failed to send {} request", method))?;

        if response.status().is_success() {
            let parsed = response
                .body_mut()
                .read_json()
                .with_context(|| format!("Failed to parse {} response", method))?;
            return Ok(parsed);
        }

        let status = response.status();
        let error: ErrorResponse = response.body_mut().read_json().unwrap_or_default();
        Err(map_error(status.as_u16(), &error.error.message))
    }

    fn session(token: TokenResponse) -> Session {
        let signed_in_at = Utc::now();
        let expires_at = token
            .expires_in
            .as_deref()
            .and_then(|secs| secs.trim().parse::<i64>().ok())
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| signed_in_at.checked_add_signed(lifetime));

        Session {
            token: token.id_token,
            user_id: token.local_id,
            email: token.email,
            display_name: token.display_name.filter(|n| !n.is_empty()),
            signed_in_at,
            expires_at,
        }
    }
}

/// Translate an Identity Toolkit error code into an `AuthError`
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be ...`.
fn map_error(status: u16, message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "EMAIL_EXISTS" => AuthError::EmailTaken,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL"
        | "USER_DISABLED" => AuthError::InvalidCredentials,
        "MISSING_PASSWORD" | "MISSING_EMAIL" => AuthError::MissingCredentials,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
        _ => AuthError::Provider(anyhow::anyhow!(
            "identity provider returned {}: {}",
            status,
            message
        )),
    }
}

impl IdentityProvider for FirebaseIdentityProvider {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        check_credentials(email, password)?;

        let token: TokenResponse = self.call(
            "signUp",
            json!({ "email": email.trim(), "password": password, "returnSecureToken": true }),
        )?;

        let display_name = display_name.trim();
        let mut session = Self::session(token);
        if !display_name.is_empty() {
            let updated: UpdateResponse = self.call(
                "update",
                json!({
                    "idToken": session.token,
                    "displayName": display_name,
                    "returnSecureToken": false,
                }),
            )?;
            session.display_name = updated.display_name.or_else(|| Some(display_name.to_string()));
        }

        Ok(session)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        check_credentials(email, password)?;

        let token: TokenResponse = self.call(
            "signInWithPassword",
            json!({ "email": email.trim(), "password": password, "returnSecureToken": true }),
        )?;
        Ok(Self::session(token))
    }

    /// ID tokens cannot be revoked with an API key; the session is dropped locally
    fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        Ok(())
    }
}
