//! Errors surfaced to callers of the reconciliation layer

/// A record was rejected before reaching any store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The category is not one of the known blog categories
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// The email address is not plausibly deliverable
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Fail with `MissingField` when `value` is empty after trimming
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
