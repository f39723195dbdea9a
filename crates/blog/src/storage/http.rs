//! Remote document database client
//!
//! Talks to a Data API style HTTP endpoint (`{base}/action/find`, `findOne`,
//! `insertOne`, `deleteOne`). Uses synchronous HTTP (ureq) to be
//! executor-agnostic; every call is bounded by the configured timeout.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::traits::{DocumentStore, ID_FIELD, normalize_id};

/// Response from `find`
#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

/// Response from `findOne`
#[derive(Debug, Deserialize)]
struct FindOneResponse {
    document: Option<Value>,
}

/// Response from `insertOne`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertOneResponse {
    inserted_id: Value,
}

/// Response from `deleteOne`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteOneResponse {
    deleted_count: u64,
}

/// Request body shared by every action
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<Value>,
}

/// HTTP client for a remote document database
pub struct HttpDocumentStore {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    data_source: String,
    database: String,
}

impl HttpDocumentStore {
    /// Collection queried by `ping`
    const PING_COLLECTION: &'static str = "_health";

    /// Create a client for the given endpoint
    ///
    /// # Arguments
    /// * `base_url` - Endpoint root, e.g. `https://data.example.com/app/v1`
    /// * `api_key` - Sent as the `api-key` header
    /// * `data_source` - Cluster name
    /// * `database` - Database holding the blog collections
    /// * `timeout` - Upper bound for each request
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        data_source: impl Into<String>,
        database: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .with_context(|| format!("Invalid document store URL: {}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Document store URL must be http(s): {}", base_url);
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            data_source: data_source.into(),
            database: database.into(),
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/action/{}", self.base_url, action)
    }

    fn request<'a>(&'a self, collection: &'a str) -> ActionRequest<'a> {
        ActionRequest {
            data_source: &self.data_source,
            database: &self.database,
            collection,
            filter: None,
            sort: None,
            document: None,
        }
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        body: &ActionRequest,
    ) -> Result<T> {
        let mut response = self
            .agent
            .post(&self.action_url(action))
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .send_json(body)
            .with_context(|| format!("Failed to send {} request", action))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", action))
    }

    /// Build an `_id` filter, matching ObjectIds when the id looks like one
    fn id_filter(id: &str) -> Value {
        if id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit()) {
            json!({ "_id": { "$oid": id } })
        } else {
            json!({ "_id": id })
        }
    }

    /// Replace extended-JSON ids with plain strings
    fn flatten_id(mut document: Value) -> Value {
        if let Some(map) = document.as_object_mut()
            && let Some(id) = map.get(ID_FIELD).and_then(normalize_id)
        {
            map.insert(ID_FIELD.to_string(), Value::String(id));
        }
        document
    }
}

impl DocumentStore for HttpDocumentStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn ping(&self) -> Result<()> {
        let mut body = self.request(Self::PING_COLLECTION);
        body.filter = Some(json!({}));
        let _: FindOneResponse = self.call("findOne", &body)?;
        Ok(())
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let mut body = self.request(collection);
        body.filter = Some(json!({}));
        body.sort = Some(json!({ "createdAt": -1 }));
        let response: FindResponse = self.call("find", &body)?;
        Ok(response.documents.into_iter().map(Self::flatten_id).collect())
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let mut body = self.request(collection);
        body.filter = Some(Self::id_filter(id));
        let response: FindOneResponse = self.call("findOne", &body)?;
        Ok(response.document.filter(|d| !d.is_null()).map(Self::flatten_id))
    }

    fn insert(&self, collection: &str, mut document: Value) -> Result<String> {
        let Some(map) = document.as_object_mut() else {
            bail!("documents must be JSON objects");
        };
        map.remove(ID_FIELD);

        let mut body = self.request(collection);
        body.document = Some(document);
        let response: InsertOneResponse = self.call("insertOne", &body)?;
        normalize_id(&response.inserted_id).context("insertOne response had no usable id")
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut body = self.request(collection);
        body.filter = Some(Self::id_filter(id));
        let response: DeleteOneResponse = self.call("deleteOne", &body)?;
        Ok(response.deleted_count > 0)
    }
}
