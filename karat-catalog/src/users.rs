use serde::{Deserialize, Serialize};

use crate::schema::lenient;
use crate::{remote, Scope};

pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// A customer-app account. The console only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("No Name")
    }
}

#[derive(Clone)]
pub struct UsersService {
    scope: Scope,
}

impl UsersService {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<User>> {
        let store = self.scope.store()?;
        let docs = store.list(COLLECTION).await.map_err(remote)?;
        docs.into_iter()
            .map(|d| d.decode().map_err(remote))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::bound;
    use karat_core::{DocumentStore, WriteMode};
    use serde_json::json;

    #[tokio::test]
    async fn lists_sparse_user_records() {
        let fx = bound();
        let full = json!({
            "mobile": 9876543210u64,
            "gender": "female",
            "pin": 1234,
            "createdAt": "2025-11-02T08:00:00Z",
            "profile": {"name": "Asha", "city": "Thrissur"}
        });
        fx.store
            .set(COLLECTION, "u1", full.as_object().cloned().unwrap(), WriteMode::Replace)
            .await
            .unwrap();
        fx.store
            .set(COLLECTION, "u2", json!({}).as_object().cloned().unwrap(), WriteMode::Replace)
            .await
            .unwrap();

        let svc = UsersService::new(fx.scope);
        let users = svc.list().await.unwrap();
        assert_eq!(users.len(), 2);

        let asha = users.iter().find(|u| u.id == "u1").unwrap();
        assert_eq!(asha.mobile.as_deref(), Some("9876543210"));
        assert_eq!(asha.pin.as_deref(), Some("1234"));
        assert_eq!(asha.display_name(), "Asha");

        let blank = users.iter().find(|u| u.id == "u2").unwrap();
        assert_eq!(blank.display_name(), "No Name");
        assert!(blank.profile.is_none());
    }
}
