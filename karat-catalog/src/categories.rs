use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

use karat_core::store::{validate_id, Fields};

use crate::image::ImageOptions;
use crate::schema::{check, lenient};
use crate::{remote, Scope};

pub const COLLECTION: &str = "firestoreCategories";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
}

impl CategoryInput {
    pub fn new(title: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image: image.into(),
        }
    }

    fn prepare(mut self, images: &ImageOptions) -> anyhow::Result<Self> {
        self.title = self.title.trim().to_string();
        check(&self, "Category validation failed")?;
        self.image = images.normalize(&self.image)?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct CategoriesService {
    scope: Scope,
    images: ImageOptions,
}

impl CategoriesService {
    pub fn new(scope: Scope, images: ImageOptions) -> Self {
        Self { scope, images }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Category>> {
        let store = self.scope.store()?;
        let docs = store.list(COLLECTION).await.map_err(remote)?;
        docs.into_iter()
            .map(|d| d.decode().map_err(remote))
            .collect()
    }

    pub async fn add(&self, input: CategoryInput) -> anyhow::Result<Category> {
        let input = input.prepare(&self.images)?;
        let store = self.scope.store()?;
        let created_at = self.scope.timestamp();

        let mut fields = Fields::new();
        fields.insert("title".into(), Value::String(input.title));
        fields.insert("image".into(), Value::String(input.image));
        fields.insert("createdAt".into(), Value::String(created_at));

        let doc = store.add(COLLECTION, fields).await.map_err(remote)?;
        info!(category = %doc.id, "category added");
        doc.decode().map_err(remote)
    }

    /// Replace title and image and stamp `updatedAt`.
    pub async fn update(&self, id: &str, input: CategoryInput) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let input = input.prepare(&self.images)?;
        let store = self.scope.store()?;

        let mut fields = Fields::new();
        fields.insert("title".into(), Value::String(input.title));
        fields.insert("image".into(), Value::String(input.image));
        fields.insert("updatedAt".into(), Value::String(self.scope.timestamp()));

        store.update(COLLECTION, id, fields).await.map_err(remote)?;
        info!(category = %id, "category updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let store = self.scope.store()?;
        store.delete(COLLECTION, id).await.map_err(remote)?;
        info!(category = %id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bound, png_base64, unbound};
    use karat_core::{DocumentStore, ErrorKind, KaratError};

    fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
        KaratError::find_in(err).map(|e| e.kind)
    }

    #[tokio::test]
    async fn add_list_update_delete() {
        let fx = bound();
        let svc = CategoriesService::new(fx.scope.clone(), ImageOptions::default());

        let pixel = png_base64(2, 2);
        let added = svc
            .add(CategoryInput::new(" Rings ", format!("data:image/png;base64,{pixel}")))
            .await
            .unwrap();
        assert_eq!(added.title, "Rings");
        assert!(added.image.starts_with("/9j/"));
        assert_eq!(added.created_at.as_deref(), Some("2026-01-15T10:30:00.000Z"));

        fx.clock.advance(chrono::Duration::minutes(5));
        svc.update(&added.id, CategoryInput::new("Gold Rings", pixel)).await.unwrap();

        let listed = svc.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Gold Rings");
        assert_eq!(listed[0].created_at, added.created_at);
        assert_eq!(listed[0].updated_at.as_deref(), Some("2026-01-15T10:35:00.000Z"));

        svc.delete(&added.id).await.unwrap();
        assert!(fx.store.is_empty(COLLECTION).await);
    }

    #[tokio::test]
    async fn missing_title_is_unprocessable() {
        let fx = bound();
        let svc = CategoriesService::new(fx.scope, ImageOptions::default());
        let err = svc.add(CategoryInput::new("   ", png_base64(2, 2))).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Unprocessable));
    }

    #[tokio::test]
    async fn update_of_missing_category_is_not_found() {
        let fx = bound();
        let svc = CategoriesService::new(fx.scope, ImageOptions::default());
        let err = svc.update("ghost", CategoryInput::new("x", png_base64(2, 2))).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn requires_bound_tenant() {
        let svc = CategoriesService::new(unbound(), ImageOptions::default());
        let err = svc.list().await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::GeneralError));
    }

    #[tokio::test]
    async fn lists_records_written_by_older_clients() {
        let fx = bound();
        let mut legacy = Fields::new();
        legacy.insert("title".into(), Value::String("Chains".into()));
        fx.store.add(COLLECTION, legacy).await.unwrap();

        let svc = CategoriesService::new(fx.scope, ImageOptions::default());
        let listed = svc.list().await.unwrap();
        assert_eq!(listed[0].title, "Chains");
        assert_eq!(listed[0].image, "");
    }
}
