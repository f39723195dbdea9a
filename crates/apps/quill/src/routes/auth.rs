use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
};
use blog::{AuthError, Session};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{failure, read_form};
use crate::state::{AppState, bearer_token};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, alias = "display_name")]
    display_name: String,
}

fn with_session(msg: &str, session: &Session) -> Json<Value> {
    Json(json!({ "success": true, "msg": msg, "session": session }))
}

fn auth_failure(e: AuthError) -> Json<Value> {
    if let AuthError::Provider(inner) = &e {
        log::warn!("Identity provider failure: {:#}", inner);
    }
    failure(e.to_string())
}

/// `POST /api/auth/signup`
pub async fn sign_up(State(state): State<AppState>, request: Request) -> Json<Value> {
    if state.site.auth.is_none() {
        return failure(AuthError::Disabled.to_string());
    }
    let form: Credentials = read_form(request).await.unwrap_or_default();

    let result = state
        .run(move |site| match &site.auth {
            Some(auth) => auth.sign_up(&form.email, &form.password, &form.display_name),
            None => Err(AuthError::Disabled),
        })
        .await;

    match result {
        Some(Ok(session)) => with_session("Account created", &session),
        Some(Err(e)) => auth_failure(e),
        None => failure("Failed to create account"),
    }
}

/// `POST /api/auth/signin`
pub async fn sign_in(State(state): State<AppState>, request: Request) -> Json<Value> {
    if state.site.auth.is_none() {
        return failure(AuthError::Disabled.to_string());
    }
    let form: Credentials = read_form(request).await.unwrap_or_default();

    let result = state
        .run(move |site| match &site.auth {
            Some(auth) => auth.sign_in(&form.email, &form.password),
            None => Err(AuthError::Disabled),
        })
        .await;

    match result {
        Some(Ok(session)) => with_session("Signed in", &session),
        Some(Err(e)) => auth_failure(e),
        None => failure("Failed to sign in"),
    }
}

/// `POST /api/auth/signout` (bearer token)
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if state.site.auth.is_none() {
        return failure(AuthError::Disabled.to_string());
    }
    let Some(token) = bearer_token(&headers).map(str::to_string) else {
        return failure(AuthError::UnknownSession.to_string());
    };

    let result = state
        .run(move |site| match &site.auth {
            Some(auth) => auth.sign_out(&token),
            None => Err(AuthError::Disabled),
        })
        .await;

    match result {
        Some(Ok(session)) => with_session("Signed out", &session),
        Some(Err(e)) => auth_failure(e),
        None => failure("Failed to sign out"),
    }
}

/// `GET /api/auth/session` (bearer token)
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let Some(auth) = &state.site.auth else {
        return failure(AuthError::Disabled.to_string());
    };

    match bearer_token(&headers).and_then(|token| auth.session(token)) {
        Some(session) => with_session("Signed in", &session),
        None => failure(AuthError::UnknownSession.to_string()),
    }
}
