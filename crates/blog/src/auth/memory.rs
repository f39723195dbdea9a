//! In-memory identity provider for development and tests

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::{AuthError, IdentityProvider, MIN_PASSWORD_LEN, Session, check_credentials};

struct Account {
    user_id: String,
    password: String,
    display_name: Option<String>,
}

/// Keeps accounts in a HashMap keyed by lowercase email
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, user_id: &str, email: &str, display_name: Option<String>) -> Session {
        Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            display_name,
            signed_in_at: Utc::now(),
            expires_at: None,
        }
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        check_credentials(email, password)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = email.trim().to_lowercase();
        let mut accounts = self.accounts.write().unwrap();
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailTaken);
        }

        let display_name = Some(display_name.trim().to_string()).filter(|n| !n.is_empty());
        let user_id = uuid::Uuid::new_v4().simple().to_string();
        accounts.insert(
            key.clone(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
                display_name: display_name.clone(),
            },
        );

        Ok(self.session(&user_id, &key, display_name))
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        check_credentials(email, password)?;

        let key = email.trim().to_lowercase();
        let accounts = self.accounts.read().unwrap();
        match accounts.get(&key) {
            Some(account) if account.password == password => {
                Ok(self.session(&account.user_id, &key, account.display_name.clone()))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        Ok(())
    }
}
