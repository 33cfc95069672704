use std::sync::Arc;
use std::time::Duration;

use karat_core::store::{DocumentStore, StoreError, StoreResult};
use karat_core::{ConnectionParams, TenantConnector};
use reqwest::Client;

use crate::adapter::FirestoreStore;

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Builds [`FirestoreStore`] handles that share one HTTP client.
#[derive(Clone)]
pub struct FirestoreConnector {
    http: Client,
    base_url: String,
}

impl FirestoreConnector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::transport)?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// A concrete store, for callers that need more than the trait object.
    pub fn open(&self, params: &ConnectionParams) -> StoreResult<FirestoreStore> {
        if params.project_id.trim().is_empty() {
            return Err(StoreError::invalid("connection parameters carry no project id"));
        }
        if params.api_key.trim().is_empty() {
            return Err(StoreError::invalid("connection parameters carry no api key"));
        }
        FirestoreStore::new(self.http.clone(), &self.base_url, params)
    }
}

impl TenantConnector for FirestoreConnector {
    fn connect(&self, params: &ConnectionParams) -> StoreResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(self.open(params)?))
    }
}
