use async_trait::async_trait;
use karat_core::store::{validate_id, Document, DocumentStore, Fields, StoreError, StoreResult, WriteMode};
use karat_core::ConnectionParams;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value};
use tracing::debug;

use crate::value::{decode_document, encode_fields};

const PAGE_SIZE: &str = "300";

/// Firestore document store for one project, talking to the REST API
/// with the project's web API key.
pub struct FirestoreStore {
    http: Client,
    documents_root: Url,
    api_key: String,
}

impl FirestoreStore {
    pub fn new(http: Client, base_url: &str, params: &ConnectionParams) -> StoreResult<Self> {
        let mut documents_root = Url::parse(base_url)
            .map_err(|e| StoreError::invalid(format!("bad firestore base url '{base_url}': {e}")))?;
        push_segments(
            &mut documents_root,
            &["projects", &params.project_id, "databases", "(default)", "documents"],
        )?;
        Ok(Self {
            http,
            documents_root,
            api_key: params.api_key.clone(),
        })
    }

    pub fn documents_root(&self) -> &str {
        self.documents_root.as_str()
    }

    fn collection_url(&self, collection: &str) -> StoreResult<Url> {
        let mut url = self.documents_root.clone();
        push_segments(&mut url, &[collection])?;
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> StoreResult<Url> {
        let mut url = self.documents_root.clone();
        push_segments(&mut url, &[collection, id])?;
        Ok(url)
    }

    fn run_query_url(&self) -> StoreResult<Url> {
        let mut url = self.documents_root.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::invalid("firestore base url cannot carry a path"))?
            .pop()
            .push("documents:runQuery");
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(StoreError::transport)?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::remote_error(response).await)
    }

    async fn remote_error(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        // Google APIs wrap failures as {"error": {"message": ...}}.
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        StoreError::Remote { status, message }
    }

    async fn json(response: Response) -> StoreResult<Value> {
        response.json::<Value>().await.map_err(StoreError::transport)
    }

    fn update_mask(fields: &Fields) -> Vec<(&'static str, String)> {
        fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", field_path(k)))
            .collect()
    }
}

/// Append each segment percent-encoded, so ids holding `#`, `?`, `%` or
/// spaces address exactly that document.
fn push_segments(url: &mut Url, segments: &[&str]) -> StoreResult<()> {
    url.path_segments_mut()
        .map_err(|_| StoreError::invalid("firestore base url cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

/// Quote a field name for use in a field path when it is not a plain
/// identifier.
fn field_path(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.collection_url(collection)?)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let body = Self::json(self.send(request).await?).await?;
            if let Some(items) = body.get("documents").and_then(|v| v.as_array()) {
                for item in items {
                    documents.push(decode_document(item)?);
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        debug!(collection, count = documents.len(), "firestore: listed collection");
        Ok(documents)
    }

    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(field) },
                        "op": "EQUAL",
                        "value": crate::value::encode_value(value),
                    }
                }
            }
        });

        let request = self.http.post(self.run_query_url()?).json(&query);
        let body = Self::json(self.send(request).await?).await?;

        // One entry per result; an empty result set still carries a lone
        // entry with only `readTime`.
        let rows = body
            .as_array()
            .ok_or_else(|| StoreError::decode("runQuery response is not an array"))?;
        let documents = rows
            .iter()
            .filter_map(|row| row.get("document"))
            .map(decode_document)
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(collection, field, count = documents.len(), "firestore: ran equality query");
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_id(id)?;
        let request = self.http.get(self.document_url(collection, id)?);
        match self.send(request).await {
            Ok(response) => Ok(Some(decode_document(&Self::json(response).await?)?)),
            Err(StoreError::Remote { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let body = json!({ "fields": encode_fields(&fields) });
        let request = self.http.post(self.collection_url(collection)?).json(&body);
        let created = decode_document(&Self::json(self.send(request).await?).await?)?;
        debug!(collection, id = %created.id, "firestore: added document");
        Ok(created)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, mode: WriteMode) -> StoreResult<()> {
        validate_id(id)?;
        let body = json!({ "fields": encode_fields(&fields) });
        let mut request = self.http.patch(self.document_url(collection, id)?).json(&body);
        if mode == WriteMode::Merge {
            request = request.query(&Self::update_mask(&fields));
        }
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        validate_id(id)?;
        let body = json!({ "fields": encode_fields(&fields) });
        let request = self
            .http
            .patch(self.document_url(collection, id)?)
            .query(&Self::update_mask(&fields))
            .query(&[("currentDocument.exists", "true")])
            .json(&body);

        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(StoreError::Remote { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(StoreError::not_found(collection, id))
            }
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        validate_id(id)?;
        self.send(self.http.delete(self.document_url(collection, id)?)).await?;
        debug!(collection, id, "firestore: deleted document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_paths_quote_special_names() {
        assert_eq!(field_path("categoryId"), "categoryId");
        assert_eq!(field_path("gold24k"), "gold24k");
        assert_eq!(field_path("24k"), "`24k`");
        assert_eq!(field_path("a.b"), "`a.b`");
    }

    #[test]
    fn documents_root_is_project_scoped() {
        let params = ConnectionParams::new("k", "shop-a");
        let store = FirestoreStore::new(Client::new(), "http://localhost:8080/v1/", &params).unwrap();
        assert_eq!(
            store.documents_root(),
            "http://localhost:8080/v1/projects/shop-a/databases/(default)/documents"
        );
        assert_eq!(
            store.run_query_url().unwrap().as_str(),
            "http://localhost:8080/v1/projects/shop-a/databases/(default)/documents:runQuery"
        );
    }

    #[test]
    fn ids_are_encoded_as_single_segments() {
        let params = ConnectionParams::new("k", "shop-a");
        let store = FirestoreStore::new(Client::new(), "http://localhost:8080/v1", &params).unwrap();
        let url = store.document_url("shops", "shop1#evil?x=1 %").unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/shop-a/databases/(default)/documents/shops/shop1%23evil%3Fx=1%20%25"
        );
        assert!(url.fragment().is_none());
        assert!(url.query().is_none());
    }
}
