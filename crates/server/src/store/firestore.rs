//! Firestore REST backend for [`DocumentStore`].
//!
//! Talks to the Firestore v1 REST API with `reqwest`. Documents are stored
//! as plain JSON maps, translated to and from Firestore's typed `fields`
//! encoding. Revisions map onto the document `updateTime`, and conditional
//! writes use `currentDocument` preconditions, so a lost race surfaces as
//! [`StoreError::PreconditionFailed`] exactly like the in-memory backend.
//!
//! Authentication uses a bearer token supplied via configuration; minting
//! and refreshing that token is the deployment's concern, not this client's.

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::config::FirestoreConfig;

use super::{Document, DocumentStore, Precondition, Revision, StoreError};

/// Firestore REST API client.
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `{endpoint}/v1/projects/{project}/databases/(default)/documents`
    base_url: String,
    access_token: secrecy::SecretString,
}

impl FirestoreStore {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &FirestoreConfig) -> Self {
        let base_url = format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            config.endpoint.trim_end_matches('/'),
            config.project_id
        );

        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token: config.access_token.clone(),
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.access_token.expose_secret())
    }

    async fn read_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            return StoreError::PreconditionFailed;
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("error")?
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("unexpected status {status}"));

        StoreError::Backend(message)
    }

    fn decode_document(raw: &Value) -> Result<Document, StoreError> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("document missing name".to_owned()))?;
        let id = name
            .rsplit('/')
            .next()
            .ok_or_else(|| StoreError::Decode("document name has no id".to_owned()))?
            .to_owned();
        let update_time = raw
            .get("updateTime")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("document missing updateTime".to_owned()))?;
        let fields = raw.get("fields").cloned().unwrap_or_else(|| json!({}));

        Ok(Document {
            id,
            data: decode_fields(&fields)?,
            revision: Revision::new(update_time),
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &self.document_url(collection, id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let raw: Value = response.json().await?;
        Ok(Some(Self::decode_document(&raw)?))
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = format!("{}/{collection}", self.base_url);
            let mut request = self
                .request(reqwest::Method::GET, &url)
                .query(&[("pageSize", "300")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(Self::read_error(response).await);
            }

            let body: Value = response.json().await?;
            if let Some(page) = body.get("documents").and_then(Value::as_array) {
                for raw in page {
                    documents.push(Self::decode_document(raw)?);
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_owned);
            if page_token.is_none() {
                break;
            }
        }

        Ok(documents)
    }

    #[instrument(skip(self, data))]
    async fn add(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        let url = format!("{}/{collection}", self.base_url);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&json!({ "fields": encode_fields(&data)? }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let raw: Value = response.json().await?;
        Self::decode_document(&raw)
    }

    #[instrument(skip(self, data, precondition))]
    async fn put(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut request = self
            .request(reqwest::Method::PATCH, &self.document_url(collection, id))
            .json(&json!({ "fields": encode_fields(&data)? }));

        request = match precondition {
            Precondition::None => request,
            Precondition::MustNotExist => request.query(&[("currentDocument.exists", "false")]),
            Precondition::Revision(revision) => {
                request.query(&[("currentDocument.updateTime", revision.as_str())])
            }
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::DELETE, &self.document_url(collection, id))
            .send()
            .await?;

        // Firestore deletes are idempotent; 404 cannot happen, but tolerate it.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }
}

/// Encode a JSON object into Firestore's `fields` map.
fn encode_fields(data: &Value) -> Result<Value, StoreError> {
    let object = data
        .as_object()
        .ok_or_else(|| StoreError::Decode("document payload must be a JSON object".to_owned()))?;

    let mut fields = Map::new();
    for (key, value) in object {
        fields.insert(key.clone(), encode_value(value));
    }
    Ok(Value::Object(fields))
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => number.as_i64().map_or_else(
            || json!({ "doubleValue": number.as_f64() }),
            // integerValue is a string in the REST encoding
            |integer| json!({ "integerValue": integer.to_string() }),
        ),
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (key, item) in map {
                fields.insert(key.clone(), encode_value(item));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Decode Firestore's `fields` map back into a plain JSON object.
fn decode_fields(fields: &Value) -> Result<Value, StoreError> {
    let object = fields
        .as_object()
        .ok_or_else(|| StoreError::Decode("fields must be a JSON object".to_owned()))?;

    let mut data = Map::new();
    for (key, value) in object {
        data.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Object(data))
}

fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::Decode("malformed Firestore value".to_owned()))?;

    if let Some((kind, inner)) = object.iter().next() {
        let decoded = match kind.as_str() {
            "nullValue" => Value::Null,
            "booleanValue" => inner.clone(),
            "integerValue" => {
                let parsed = match inner {
                    Value::String(text) => text.parse::<i64>().ok(),
                    Value::Number(number) => number.as_i64(),
                    _ => None,
                };
                parsed
                    .map(Value::from)
                    .ok_or_else(|| StoreError::Decode("bad integerValue".to_owned()))?
            }
            "doubleValue" => inner.clone(),
            "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
            "arrayValue" => {
                let items = inner
                    .get("values")
                    .and_then(Value::as_array)
                    .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                    .transpose()?
                    .unwrap_or_default();
                Value::Array(items)
            }
            "mapValue" => {
                let fields = inner.get("fields").cloned().unwrap_or_else(|| json!({}));
                decode_fields(&fields)?
            }
            other => {
                return Err(StoreError::Decode(format!("unknown value kind: {other}")));
            }
        };
        return Ok(decoded);
    }

    Err(StoreError::Decode("empty Firestore value".to_owned()))
}
