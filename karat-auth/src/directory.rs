//! Shop directory lookups against the master store.

use std::sync::Arc;

use karat_core::store::{DocumentStore, StoreError};
use karat_core::ConnectionParams;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::verifier::CredentialVerifier;

/// A shop record as stored in the directory collection. Only the
/// connection fields leave this module.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopRecord {
    password: String,
    api_key: String,
    #[serde(default)]
    auth_domain: String,
    project_id: String,
    #[serde(default)]
    app_id: String,
    #[serde(default)]
    messaging_sender_id: String,
    #[serde(default)]
    measurement_id: String,
    #[serde(default)]
    shop_name: String,
}

impl ShopRecord {
    fn into_params(self) -> ConnectionParams {
        ConnectionParams {
            api_key: self.api_key,
            auth_domain: self.auth_domain,
            project_id: self.project_id,
            app_id: self.app_id,
            messaging_sender_id: self.messaging_sender_id,
            measurement_id: self.measurement_id,
            shop_name: self.shop_name,
        }
    }
}

/// Reads the master directory and checks shop credentials.
pub struct DirectoryClient {
    store: Arc<dyn DocumentStore>,
    verifier: Arc<dyn CredentialVerifier>,
    collection: String,
}

impl DirectoryClient {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn CredentialVerifier>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            verifier,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Look up `shop_id` and check `password` against its secret.
    ///
    /// On success returns the shop's connection parameters without the
    /// secret.
    pub async fn authenticate(&self, shop_id: &str, password: &str) -> AuthResult<ConnectionParams> {
        let found = match self.store.get(&self.collection, shop_id).await {
            Ok(found) => found,
            // An id that cannot name a document cannot name a shop either.
            Err(StoreError::Invalid { .. }) => None,
            Err(source) => {
                warn!(shop_id, error = %source, "directory lookup failed");
                return Err(AuthError::DirectoryLookupFailed { source });
            }
        };

        let Some(doc) = found else {
            debug!(shop_id, "no directory record");
            return Err(AuthError::ShopNotFound {
                shop_id: shop_id.to_string(),
            });
        };

        let record: ShopRecord = doc.decode().map_err(|source| {
            warn!(shop_id, error = %source, "malformed directory record");
            AuthError::DirectoryLookupFailed { source }
        })?;

        if !self.verifier.verify(password, &record.password)? {
            debug!(shop_id, "credential mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let params = record.into_params();
        info!(shop_id, tenant = %params.project_id, "shop authenticated");
        Ok(params)
    }
}
