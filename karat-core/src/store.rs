use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::KaratError;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised at the document store seam.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Tenant connection is not initialized")]
    TenantNotInitialized,

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Remote store unreachable: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unexpected document encoding: {message}")]
    Decode { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    /// True for failures of the remote round trip itself.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::Transport { .. } | Self::Decode { .. } | Self::Serialization { .. }
        )
    }
}

impl From<StoreError> for KaratError {
    fn from(err: StoreError) -> Self {
        let rendered = err.to_string();
        match err {
            StoreError::NotFound { .. } => KaratError::not_found(rendered),
            StoreError::TenantNotInitialized => KaratError::general_error(rendered),
            StoreError::Invalid { message } => KaratError::unprocessable(message),
            other => KaratError::bad_gateway(format!("Remote operation failed: {rendered}"))
                .with_source(anyhow::Error::new(other)),
        }
    }
}

/// A document read back from a store: its id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Flatten into a JSON object with the id under `"id"`.
    pub fn into_value(self) -> Value {
        let mut obj = self.fields;
        obj.insert("id".to_string(), Value::String(self.id));
        Value::Object(obj)
    }

    /// Decode into a typed record; the id is exposed as field `"id"`.
    pub fn decode<T: DeserializeOwned>(self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}

/// Serialize a record into store fields. `"id"` is never written.
pub fn to_fields<T: Serialize>(record: &T) -> StoreResult<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::invalid(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// How `set` treats fields already on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite the whole document, creating it if missing.
    Replace,
    /// Only write the supplied fields, creating the document if missing.
    Merge,
}

/// Core operations every tenant store must provide.
///
/// Collections are flat: one level of `collection/id`. A handle is
/// shared by all feature modules, so implementations must be cheap to
/// call concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection.
    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Documents whose `field` equals `value`.
    async fn find_eq(&self, collection: &str, field: &str, value: &Value) -> StoreResult<Vec<Document>>;

    /// A single document, `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Insert with a store-generated id.
    async fn add(&self, collection: &str, fields: Fields) -> StoreResult<Document>;

    /// Write a document under a known id.
    async fn set(&self, collection: &str, id: &str, fields: Fields, mode: WriteMode) -> StoreResult<()>;

    /// Merge fields into an existing document; `NotFound` if it is missing.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Reject ids that would escape the `collection/id` layout.
pub fn validate_id(id: &str) -> StoreResult<()> {
    if id.trim().is_empty() {
        return Err(StoreError::invalid("document id must not be empty"));
    }
    if id.contains('/') {
        return Err(StoreError::invalid(format!("document id '{id}' must not contain '/'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Plan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    }

    #[test]
    fn decode_exposes_id() {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("Gold Saver"));
        let plan: Plan = Document::new("p1", fields).decode().unwrap();
        assert_eq!(plan, Plan { id: Some("p1".into()), name: "Gold Saver".into() });
    }

    #[test]
    fn to_fields_drops_id() {
        let fields = to_fields(&Plan { id: Some("p1".into()), name: "x".into() }).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["name"], json!("x"));
    }

    #[test]
    fn store_errors_map_to_kinds() {
        let kind = |e: StoreError| KaratError::from(e).kind;
        assert_eq!(kind(StoreError::not_found("c", "1")), ErrorKind::NotFound);
        assert_eq!(kind(StoreError::invalid("x")), ErrorKind::Unprocessable);
        assert_eq!(kind(StoreError::TenantNotInitialized), ErrorKind::GeneralError);
        assert_eq!(
            kind(StoreError::Remote { status: 500, message: "x".into() }),
            ErrorKind::BadGateway
        );
    }

    #[test]
    fn ids_with_slashes_are_rejected() {
        assert!(validate_id("abc").is_ok());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id(" ").is_err());
    }
}
