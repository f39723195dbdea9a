use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use blog::{Session, Site};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
}

impl AppState {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(site),
        }
    }

    /// Run blocking site work on the blocking pool
    ///
    /// The blog crate is synchronous; a panic inside `f` becomes `None`.
    pub async fn run<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&Site) -> T + Send + 'static,
        T: Send + 'static,
    {
        let site = self.site.clone();
        match tokio::task::spawn_blocking(move || f(&site)).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Blocking task failed: {}", e);
                None
            }
        }
    }

    /// Check the admin guard for a request
    ///
    /// Returns `Ok(None)` when admin endpoints are open.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Option<Session>, &'static str> {
        if !self.site.admin_protected() {
            return Ok(None);
        }

        let Some(auth) = &self.site.auth else {
            return Ok(None);
        };

        bearer_token(headers)
            .and_then(|token| auth.session(token))
            .map(Some)
            .ok_or("Authentication required")
    }
}

/// Token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
