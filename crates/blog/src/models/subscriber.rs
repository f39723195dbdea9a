//! Newsletter subscriber model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, RecordId, unknown_created_at};
use crate::error::{ValidationError, require};

/// An email address captured by the subscription form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: RecordId,
    pub email: String,
    #[serde(alias = "date", default = "unknown_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    /// Create a new, unsaved subscriber. Surrounding whitespace is dropped.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: RecordId::default(),
            email: email.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Cheap syntactic check: one `@`, non-empty local part, dotted domain, no spaces
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

impl Record for Subscriber {
    const COLLECTION: &'static str = "emails";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("Email", &self.email)?;
        if !is_plausible_email(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}
