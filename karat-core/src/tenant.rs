//! Core multi-tenant types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a tenant's backing store. Derived from the project id of
/// its connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to open a handle to one shop's document store.
///
/// This is the whitelisted copy of a directory record: it never carries
/// the shop secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    pub project_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub measurement_id: String,
    #[serde(default)]
    pub shop_name: String,
}

impl ConnectionParams {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_domain: String::new(),
            project_id: project_id.into(),
            app_id: String::new(),
            messaging_sender_id: String::new(),
            measurement_id: String::new(),
            shop_name: String::new(),
        }
    }

    pub fn with_shop_name(mut self, shop_name: impl Into<String>) -> Self {
        self.shop_name = shop_name.into();
        self
    }

    pub fn tenant_id(&self) -> TenantId {
        TenantId(self.project_id.clone())
    }
}

// The api key stays out of logs.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("api_key", &"<redacted>")
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("app_id", &self.app_id)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("measurement_id", &self.measurement_id)
            .field("shop_name", &self.shop_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_bundle() {
        let params = ConnectionParams::new("key-1", "shop-a").with_shop_name("Shop A");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["apiKey"], "key-1");
        assert_eq!(value["projectId"], "shop-a");
        assert_eq!(value["shopName"], "Shop A");
        assert_eq!(value.as_object().unwrap().len(), 7);
    }

    #[test]
    fn debug_redacts_api_key() {
        let params = ConnectionParams::new("secret-key", "shop-a");
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("shop-a"));
    }
}
