use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Direction, Document, DocumentStore, FieldUpdate, Fields, FilterOp, Query, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    /// OAuth access token; `None` for the local emulator.
    pub access_token: Option<String>,
    pub poll_interval: Duration,
}

/// Firestore over its REST API. Live watches poll the document or query.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<RestDocument>,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Self {
        tracing::info!(
            project = %config.project_id,
            database = %config.database,
            "Firestore client initialized"
        );
        Self {
            client: Client::new(),
            config,
        }
    }

    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.config.project_id, self.config.database
        )
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> StoreResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Backend { status, body })
    }

    async fn fetch(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let url = self.url(&self.document_name(collection, id));
        let response = self.authorized(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: RestDocument = Self::check(response).await?.json().await?;
        Ok(Some(from_rest(doc)))
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let url = self.url(&format!("{}:runQuery", self.documents_root()));
        let body = json!({ "structuredQuery": structured_query(query) });
        let response = self.authorized(self.client.post(url)).json(&body).send().await?;
        let items: Vec<RunQueryItem> = Self::check(response).await?.json().await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(from_rest)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.fetch(collection, id).await
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> StoreResult<Document> {
        let url = self.url(&format!("{}/{collection}", self.documents_root()));
        let mut request = self.authorized(self.client.post(url));
        if let Some(id) = id {
            request = request.query(&[("documentId", id)]);
        }
        let response = request
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.unwrap_or_default().to_string(),
            });
        }
        let doc: RestDocument = Self::check(response).await?.json().await?;
        Ok(from_rest(doc))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let url = self.url(&self.document_name(collection, id));
        let response = self
            .authorized(self.client.patch(url))
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<(String, FieldUpdate)>,
    ) -> StoreResult<Document> {
        let url = self.url(&format!("{}:commit", self.documents_root()));
        let write = update_write(&self.document_name(collection, id), &updates);
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        Self::check(response).await?;
        self.fetch(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let url = self.url(&self.document_name(collection, id));
        let response = self.authorized(self.client.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.run_query(query).await
    }

    fn watch_document(&self, collection: &str, id: &str) -> BoxStream<'static, StoreResult<Option<Document>>> {
        let store = self.clone();
        let collection = collection.to_string();
        let id = id.to_string();
        let interval = self.config.poll_interval;

        async_stream::stream! {
            let mut last: Option<Option<Document>> = None;
            loop {
                match store.fetch(&collection, &id).await {
                    Ok(current) => {
                        if last.as_ref() != Some(&current) {
                            last = Some(current.clone());
                            yield Ok(current);
                        }
                    }
                    Err(e) => yield Err(e),
                }
                tokio::time::sleep(interval).await;
            }
        }
        .boxed()
    }

    fn watch_query(&self, query: Query) -> BoxStream<'static, StoreResult<Vec<Document>>> {
        let store = self.clone();
        let interval = self.config.poll_interval;

        async_stream::stream! {
            let mut last: Option<Vec<Document>> = None;
            loop {
                match store.run_query(&query).await {
                    Ok(current) => {
                        if last.as_ref() != Some(&current) {
                            last = Some(current.clone());
                            yield Ok(current);
                        }
                    }
                    Err(e) => yield Err(e),
                }
                tokio::time::sleep(interval).await;
            }
        }
        .boxed()
    }
}

fn from_rest(doc: RestDocument) -> Document {
    let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
    let fields = doc
        .fields
        .into_iter()
        .map(|(k, v)| (k, decode_value(v)))
        .collect();
    Document::new(id, fields)
}

fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_field(k, v)))
            .collect(),
    )
}

/// Fields holding RFC 3339 strings that are stored as Firestore timestamps,
/// at any nesting depth.
const TIMESTAMP_FIELDS: [&str; 1] = ["createdAt"];

/// Encode the value of a named field. Timestamp fields become
/// `timestampValue` so they order chronologically; everything else goes
/// through [`encode_value`].
pub(crate) fn encode_field(name: &str, value: &Value) -> Value {
    match value {
        Value::String(s) if TIMESTAMP_FIELDS.iter().any(|f| *f == name) && DateTime::parse_from_rfc3339(s).is_ok() => {
            json!({ "timestampValue": s })
        }
        _ => encode_value(value),
    }
}

/// Encode a JSON value as a Firestore typed value.
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn decode_value(value: Value) -> Value {
    let Value::Object(mut typed) = value else {
        return Value::Null;
    };
    if let Some(v) = typed.remove("integerValue") {
        return match v {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other,
        };
    }
    if let Some(v) = typed.remove("arrayValue") {
        let values = match v.get("values") {
            Some(Value::Array(items)) => items.iter().cloned().map(decode_value).collect(),
            _ => Vec::new(),
        };
        return Value::Array(values);
    }
    if let Some(v) = typed.remove("mapValue") {
        let fields = match v.get("fields") {
            Some(Value::Object(fields)) => fields
                .iter()
                .map(|(k, v)| (k.clone(), decode_value(v.clone())))
                .collect(),
            _ => Map::new(),
        };
        return Value::Object(fields);
    }
    for key in [
        "stringValue",
        "timestampValue",
        "booleanValue",
        "doubleValue",
        "referenceValue",
        "bytesValue",
        "geoPointValue",
    ] {
        if let Some(v) = typed.remove(key) {
            return v;
        }
    }
    Value::Null
}

fn field_ref(field: &str) -> Value {
    json!({ "fieldPath": field })
}

/// Build the `structuredQuery` body for `documents:runQuery`.
pub(crate) fn structured_query(query: &Query) -> Value {
    let mut body = Map::new();
    body.insert("from".into(), json!([{ "collectionId": query.collection }]));

    let mut filters: Vec<Value> = query
        .filters
        .iter()
        .map(|f| {
            let op = match f.op {
                FilterOp::Equal => "EQUAL",
                FilterOp::NotEqual => "NOT_EQUAL",
                FilterOp::ArrayContains => "ARRAY_CONTAINS",
                FilterOp::ArrayContainsAny => "ARRAY_CONTAINS_ANY",
            };
            json!({
                "fieldFilter": {
                    "field": field_ref(&f.field),
                    "op": op,
                    "value": encode_field(&f.field, &f.value),
                }
            })
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => {
            body.insert("where".into(), filters.remove(0));
        }
        _ => {
            body.insert(
                "where".into(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if !query.order_by.is_empty() {
        let orders: Vec<Value> = query
            .order_by
            .iter()
            .map(|o| {
                let direction = match o.direction {
                    Direction::Ascending => "ASCENDING",
                    Direction::Descending => "DESCENDING",
                };
                json!({ "field": field_ref(&o.field), "direction": direction })
            })
            .collect();
        body.insert("orderBy".into(), Value::Array(orders));
    }
    if let Some(limit) = query.limit {
        body.insert("limit".into(), json!(limit));
    }
    Value::Object(body)
}

/// Build a `documents:commit` write for a partial update. Plain sets go
/// through the update mask, array operations through field transforms, and
/// the write fails if the document does not exist.
pub(crate) fn update_write(name: &str, updates: &[(String, FieldUpdate)]) -> Value {
    let mut fields = Map::new();
    let mut mask = Vec::new();
    let mut transforms = Vec::new();

    for (field, update) in updates {
        match update {
            FieldUpdate::Set(value) => {
                fields.insert(field.clone(), encode_field(field, value));
                mask.push(Value::String(field.clone()));
            }
            FieldUpdate::ArrayUnion(items) => transforms.push(json!({
                "fieldPath": field,
                "appendMissingElements": { "values": items.iter().map(encode_value).collect::<Vec<_>>() },
            })),
            FieldUpdate::ArrayRemove(items) => transforms.push(json!({
                "fieldPath": field,
                "removeAllFromArray": { "values": items.iter().map(encode_value).collect::<Vec<_>>() },
            })),
        }
    }

    json!({
        "update": { "name": name, "fields": fields },
        "updateMask": { "fieldPaths": mask },
        "updateTransforms": transforms,
        "currentDocument": { "exists": true },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_typed_document_fields() {
        let typed = json!({
            "mapValue": { "fields": {
                "age": { "integerValue": "29" },
                "score": { "doubleValue": 1.5 },
                "createdAt": { "timestampValue": "2024-03-01T10:00:00Z" },
                "tags": { "arrayValue": { "values": [ { "stringValue": "Music" } ] } },
                "likes": { "arrayValue": {} },
                "read": { "booleanValue": false },
                "postId": { "nullValue": null },
            } }
        });
        assert_eq!(
            decode_value(typed),
            json!({
                "age": 29,
                "score": 1.5,
                "createdAt": "2024-03-01T10:00:00Z",
                "tags": ["Music"],
                "likes": [],
                "read": false,
                "postId": null,
            })
        );
    }

    #[test]
    fn encodes_integers_as_strings_and_timestamps_as_timestamps() {
        assert_eq!(encode_value(&json!(7)), json!({ "integerValue": "7" }));
        assert_eq!(
            encode_field("createdAt", &json!("2024-03-01T10:00:00Z")),
            json!({ "timestampValue": "2024-03-01T10:00:00Z" })
        );
        assert_eq!(encode_field("city", &json!("Austin")), json!({ "stringValue": "Austin" }));
    }

    #[test]
    fn date_shaped_text_stays_a_string() {
        let comment = json!({
            "text": "2024-03-01T10:00:00Z",
            "createdAt": "2024-03-01T10:00:00Z",
        });
        let encoded = encode_field("comments", &json!([comment]));
        let fields = &encoded["arrayValue"]["values"][0]["mapValue"]["fields"];
        assert_eq!(fields["text"], json!({ "stringValue": "2024-03-01T10:00:00Z" }));
        assert_eq!(fields["createdAt"], json!({ "timestampValue": "2024-03-01T10:00:00Z" }));
        assert_eq!(decode_value(encoded), json!([comment]));

        assert_eq!(
            encode_field("description", &json!("2024-03-01T10:00:00Z")),
            json!({ "stringValue": "2024-03-01T10:00:00Z" })
        );
    }

    #[test]
    fn array_contains_filter_body() {
        let body = structured_query(&Query::collection("users").where_array_contains("followers", "u1"));
        assert_eq!(body["where"]["fieldFilter"]["op"], "ARRAY_CONTAINS");
        assert_eq!(body["where"]["fieldFilter"]["value"], json!({ "stringValue": "u1" }));
    }

    #[test]
    fn composite_query_body() {
        let q = Query::collection("posts")
            .where_array_contains_any("tags", vec![json!("Music")])
            .where_ne("ownerId", "u1")
            .order_by("ownerId", Direction::Ascending)
            .order_by("createdAt", Direction::Descending)
            .limit(100);
        let body = structured_query(&q);
        assert_eq!(body["from"][0]["collectionId"], "posts");
        let filters = body["where"]["compositeFilter"]["filters"].as_array().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["fieldFilter"]["op"], "ARRAY_CONTAINS_ANY");
        assert_eq!(filters[1]["fieldFilter"]["value"], json!({ "stringValue": "u1" }));
        assert_eq!(body["orderBy"][1]["direction"], "DESCENDING");
        assert_eq!(body["limit"], 100);
    }

    #[test]
    fn single_filter_is_not_wrapped() {
        let body = structured_query(&Query::collection("users").where_eq("username", "ana"));
        assert_eq!(body["where"]["fieldFilter"]["op"], "EQUAL");
        assert!(body.get("orderBy").is_none());
    }

    #[test]
    fn update_write_splits_sets_and_transforms() {
        let write = update_write(
            "projects/p/databases/(default)/documents/users/u1",
            &[
                ("city".into(), FieldUpdate::Set(json!("Austin"))),
                ("followers".into(), FieldUpdate::union_str("u2")),
                ("following".into(), FieldUpdate::remove_str("u3")),
            ],
        );
        assert_eq!(write["updateMask"]["fieldPaths"], json!(["city"]));
        assert_eq!(write["update"]["fields"]["city"], json!({ "stringValue": "Austin" }));
        assert_eq!(write["updateTransforms"][0]["appendMissingElements"]["values"][0]["stringValue"], "u2");
        assert_eq!(write["updateTransforms"][1]["fieldPath"], "following");
        assert_eq!(write["currentDocument"]["exists"], true);
    }
}
