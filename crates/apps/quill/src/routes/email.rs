use axum::{
    Json,
    extract::{FromRequest, Multipart, Query, Request, State, rejection::QueryRejection},
    http::HeaderMap,
};
use blog::DeleteOutcome;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{IdQuery, content_type, failure, read_form, reply};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct EmailForm {
    email: Option<String>,
}

/// `GET /api/email`
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Err(msg) = state.authorize(&headers) {
        return failure(msg);
    }

    let emails = state.run(|site| site.emails.list()).await.unwrap_or_default();
    Json(json!({ "emails": emails }))
}

/// `POST /api/email` (multipart, urlencoded or JSON)
pub async fn subscribe(State(state): State<AppState>, request: Request) -> Json<Value> {
    let email = read_email(request).await.unwrap_or_default();

    match state.run(move |site| site.subscribe(&email)).await {
        Some(Ok(outcome)) if outcome.used_fallback() => Json(json!({
            "success": true,
            "msg": "Email Subscribed Successfully! (Local Storage)",
            "usedFallback": true,
        })),
        Some(Ok(_)) => reply(true, "Email Subscribed Successfully!"),
        Some(Err(e)) => failure(e.to_string()),
        None => failure("Failed to subscribe email. Please try again."),
    }
}

/// `DELETE /api/email?id=`
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Json<Value> {
    if let Err(msg) = state.authorize(&headers) {
        return failure(msg);
    }

    let Some(id) = IdQuery::requested(query) else {
        return failure("Email ID is required");
    };

    match state.run(move |site| site.emails.delete(&id)).await {
        Some(DeleteOutcome::Primary) => reply(true, "Email Deleted"),
        Some(DeleteOutcome::Fallback) => reply(true, "Email Deleted (Local Storage)"),
        Some(DeleteOutcome::NotFound) => failure("Email not found"),
        None => failure("Failed to delete email"),
    }
}

/// Pull the `email` field out of whatever body the client sent
async fn read_email(request: Request) -> Option<String> {
    if content_type(&request).starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &()).await.ok()?;
        while let Some(field) = multipart.next_field().await.ok()? {
            if field.name() == Some("email") {
                return field.text().await.ok();
            }
        }
        None
    } else {
        read_form::<EmailForm>(request).await?.email
    }
}
