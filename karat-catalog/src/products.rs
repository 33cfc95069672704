use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use karat_core::store::{to_fields, validate_id};
use karat_core::KaratError;

use crate::image::ImageOptions;
use crate::schema::{check, lenient};
use crate::{remote, Scope};

pub const COLLECTION: &str = "newProducts";

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub weight: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub karat: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub making: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub image: String,
    #[serde(default = "yes", deserialize_with = "lenient::flag")]
    pub stock: bool,
    #[serde(default = "yes", deserialize_with = "lenient::flag")]
    pub show: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub shop: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category_id: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// The product form. Weight, karat and making charge are free text as
/// the shop types them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub karat: String,
    #[serde(default)]
    pub making: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
    #[serde(default = "yes")]
    pub stock: bool,
    #[serde(default = "yes")]
    pub show: bool,
    #[serde(default)]
    pub shop: String,
    #[validate(length(min = 1, message = "categoryId is required"))]
    pub category_id: String,
}

impl ProductInput {
    pub fn new(title: impl Into<String>, image: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            weight: String::new(),
            karat: String::new(),
            making: String::new(),
            description: String::new(),
            image: image.into(),
            stock: true,
            show: true,
            shop: String::new(),
            category_id: category_id.into(),
        }
    }

    fn prepare(mut self, images: &ImageOptions) -> anyhow::Result<Self> {
        self.title = self.title.trim().to_string();
        self.category_id = self.category_id.trim().to_string();
        check(&self, "Product validation failed")?;
        self.image = images.normalize(&self.image)?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct ProductsService {
    scope: Scope,
    images: ImageOptions,
}

impl ProductsService {
    pub fn new(scope: Scope, images: ImageOptions) -> Self {
        Self { scope, images }
    }

    /// Products whose `categoryId` equals `category_id`.
    pub async fn list_by_category(&self, category_id: &str) -> anyhow::Result<Vec<Product>> {
        let category_id = category_id.trim();
        if category_id.is_empty() {
            return Err(KaratError::bad_request("categoryId is required").into_anyhow());
        }
        let store = self.scope.store()?;
        let docs = store
            .find_eq(COLLECTION, "categoryId", &Value::String(category_id.to_string()))
            .await
            .map_err(remote)?;
        debug!(category = %category_id, count = docs.len(), "products listed");
        docs.into_iter()
            .map(|d| d.decode().map_err(remote))
            .collect()
    }

    /// Store a new product with a `PRD-<epoch millis>` product id.
    pub async fn add(&self, input: ProductInput) -> anyhow::Result<Product> {
        let input = input.prepare(&self.images)?;
        let store = self.scope.store()?;
        let now = self.scope.now();

        let mut fields = to_fields(&input).map_err(remote)?;
        fields.insert(
            "productId".into(),
            Value::String(format!("PRD-{}", now.timestamp_millis())),
        );
        fields.insert("createdAt".into(), Value::String(self.scope.timestamp()));

        let doc = store.add(COLLECTION, fields).await.map_err(remote)?;
        info!(product = %doc.id, category = %input.category_id, "product added");
        doc.decode().map_err(remote)
    }

    /// Overwrite the form fields and stamp `updatedAt`. The product id and
    /// creation time are kept.
    pub async fn update(&self, id: &str, input: ProductInput) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let input = input.prepare(&self.images)?;
        let store = self.scope.store()?;

        let mut fields = to_fields(&input).map_err(remote)?;
        fields.insert("updatedAt".into(), Value::String(self.scope.timestamp()));

        store.update(COLLECTION, id, fields).await.map_err(remote)?;
        info!(product = %id, "product updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let store = self.scope.store()?;
        store.delete(COLLECTION, id).await.map_err(remote)?;
        info!(product = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bound, png_base64};
    use karat_core::{DocumentStore, ErrorKind};

    fn ring(category: &str) -> ProductInput {
        ProductInput {
            weight: "4.2".into(),
            karat: "22".into(),
            making: "12%".into(),
            shop: "Main Road".into(),
            ..ProductInput::new("Band", png_base64(2, 2), category)
        }
    }

    #[tokio::test]
    async fn add_assigns_product_id_and_defaults() {
        let fx = bound();
        let svc = ProductsService::new(fx.scope.clone(), ImageOptions::default());
        let p = svc.add(ring("cat-1")).await.unwrap();

        let millis = fx.clock_millis();
        assert_eq!(p.product_id, Some(format!("PRD-{millis}")));
        assert!(p.stock && p.show);
        assert_eq!(p.karat, "22");
        assert!(p.created_at.is_some());
        assert!(p.updated_at.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let fx = bound();
        let svc = ProductsService::new(fx.scope.clone(), ImageOptions::default());
        svc.add(ring("cat-1")).await.unwrap();
        svc.add(ring("cat-1")).await.unwrap();
        svc.add(ring("cat-2")).await.unwrap();

        assert_eq!(svc.list_by_category("cat-1").await.unwrap().len(), 2);
        assert_eq!(svc.list_by_category("cat-2").await.unwrap().len(), 1);
        assert!(svc.list_by_category("cat-3").await.unwrap().is_empty());

        let err = svc.list_by_category(" ").await.unwrap_err();
        assert_eq!(KaratError::find_in(&err).map(|e| e.kind), Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn update_keeps_identity_fields() {
        let fx = bound();
        let svc = ProductsService::new(fx.scope.clone(), ImageOptions::default());
        let p = svc.add(ring("cat-1")).await.unwrap();

        fx.clock.advance(chrono::Duration::seconds(30));
        let mut edit = ring("cat-1");
        edit.stock = false;
        svc.update(&p.id, edit).await.unwrap();

        let doc = fx.store.get(COLLECTION, &p.id).await.unwrap().unwrap();
        let stored: Product = doc.decode().unwrap();
        assert_eq!(stored.product_id, p.product_id);
        assert_eq!(stored.created_at, p.created_at);
        assert!(!stored.stock);
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn category_is_required() {
        let fx = bound();
        let svc = ProductsService::new(fx.scope, ImageOptions::default());
        let err = svc.add(ring("")).await.unwrap_err();
        let ke = KaratError::find_in(&err).unwrap();
        assert_eq!(ke.kind, ErrorKind::Unprocessable);
        let errors = ke.errors.as_ref().unwrap();
        assert!(errors.get("category_id").or_else(|| errors.get("categoryId")).is_some());
    }
}
