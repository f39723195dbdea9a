use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// `GET /api/status`
///
/// Pings the primary store for both collections before reporting.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let states = state
        .run(|site| (site.blogs.probe(), site.emails.probe()))
        .await;

    match states {
        Some((blogs, emails)) => Json(json!({
            "blogs": blogs,
            "emails": emails,
            "auth": state.site.auth.is_some(),
        })),
        None => Json(json!({
            "blogs": state.site.blogs.connection_state(),
            "emails": state.site.emails.connection_state(),
            "auth": state.site.auth.is_some(),
        })),
    }
}
