//! Today's metal rates, a single document per shop.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use karat_core::store::{to_fields, WriteMode};
use karat_core::KaratError;

use crate::schema::lenient;
use crate::{remote, Scope};

pub const COLLECTION: &str = "metalRates";
pub const DOCUMENT: &str = "currentRates";

/// Rates per gram. Stored as numbers; the form may send strings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct MetalRates {
    #[serde(default, deserialize_with = "lenient::number")]
    pub gold24k: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub gold22k: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub gold18k: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub gold14k: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub silver: f64,
}

/// A partial rates edit. Only the metals present are written.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct RatesPatch {
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub gold24k: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub gold22k: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub gold18k: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub gold14k: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub silver: Option<f64>,
}

impl From<MetalRates> for RatesPatch {
    fn from(r: MetalRates) -> Self {
        Self {
            gold24k: Some(r.gold24k),
            gold22k: Some(r.gold22k),
            gold18k: Some(r.gold18k),
            gold14k: Some(r.gold14k),
            silver: Some(r.silver),
        }
    }
}

#[derive(Clone)]
pub struct RatesService {
    scope: Scope,
}

impl RatesService {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn get(&self) -> anyhow::Result<Option<MetalRates>> {
        let store = self.scope.store()?;
        match store.get(COLLECTION, DOCUMENT).await.map_err(remote)? {
            Some(doc) => Ok(Some(doc.decode().map_err(remote)?)),
            None => Ok(None),
        }
    }

    /// Create the rates document. Returns `false` and writes nothing when
    /// it already exists.
    pub async fn add(&self, rates: MetalRates) -> anyhow::Result<bool> {
        let store = self.scope.store()?;
        if store.get(COLLECTION, DOCUMENT).await.map_err(remote)?.is_some() {
            warn!("metal rates already exist, use update instead");
            return Ok(false);
        }
        store
            .set(COLLECTION, DOCUMENT, to_fields(&rates).map_err(remote)?, WriteMode::Replace)
            .await
            .map_err(remote)?;
        info!("metal rates created");
        Ok(true)
    }

    /// Merge the metals present in `patch` into the document, creating it
    /// if needed. Metals left out keep their stored value.
    pub async fn update(&self, patch: RatesPatch) -> anyhow::Result<()> {
        let fields = to_fields(&patch).map_err(remote)?;
        if fields.is_empty() {
            return Err(KaratError::unprocessable("No rates to update").into_anyhow());
        }
        let store = self.scope.store()?;
        store
            .set(COLLECTION, DOCUMENT, fields, WriteMode::Merge)
            .await
            .map_err(remote)?;
        info!("metal rates updated");
        Ok(())
    }

    /// Add when absent, otherwise update.
    pub async fn save(&self, rates: MetalRates) -> anyhow::Result<()> {
        if !self.add(rates).await? {
            self.update(rates.into()).await?;
        }
        Ok(())
    }

    pub async fn delete(&self) -> anyhow::Result<()> {
        let store = self.scope.store()?;
        store.delete(COLLECTION, DOCUMENT).await.map_err(remote)?;
        info!("metal rates deleted");
        Ok(())
    }
}
