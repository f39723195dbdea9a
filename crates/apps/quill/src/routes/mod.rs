//! HTTP handlers
//!
//! Every handler answers with HTTP 200; failures are reported in the JSON
//! body as `{ "success": false, "msg": ... }`.

pub mod auth;
pub mod blog;
pub mod email;
pub mod status;

use axum::{
    Form, Json,
    extract::{FromRequest, Query, Request, rejection::QueryRejection},
    http::header::CONTENT_TYPE,
};
use log::warn;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// `?id=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    /// The id, if present and non-blank
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// The id from a query string that may not have parsed
    ///
    /// A malformed query (e.g. a repeated `id`) counts as no id at all.
    pub fn requested(query: Result<Query<IdQuery>, QueryRejection>) -> Option<String> {
        match query {
            Ok(Query(query)) => query.id().map(str::to_string),
            Err(e) => {
                warn!("Ignoring malformed query string: {}", e);
                None
            }
        }
    }
}

/// `{ "success": ..., "msg": ... }`
pub fn reply(success: bool, msg: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": success, "msg": msg.into() }))
}

/// `{ "success": false, "msg": ... }`
pub fn failure(msg: impl Into<String>) -> Json<Value> {
    reply(false, msg)
}

/// Lowercased `Content-Type` of a request
pub(crate) fn content_type(request: &Request) -> String {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Decode a JSON or urlencoded form body
///
/// Returns `None` when the body doesn't parse.
pub(crate) async fn read_form<T>(request: Request) -> Option<T>
where
    T: DeserializeOwned + Send + 'static,
{
    if content_type(&request).starts_with("application/json") {
        let Json(value) = Json::<T>::from_request(request, &()).await.ok()?;
        Some(value)
    } else {
        let Form(value) = Form::<T>::from_request(request, &()).await.ok()?;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_query() {
        assert_eq!(IdQuery { id: None }.id(), None);
        assert_eq!(IdQuery { id: Some("  ".into()) }.id(), None);
        assert_eq!(IdQuery { id: Some(" 42 ".into()) }.id(), Some("42"));
    }

    #[test]
    fn test_reply_shape() {
        let Json(body) = failure("nope");
        assert_eq!(body, json!({ "success": false, "msg": "nope" }));
    }
}
