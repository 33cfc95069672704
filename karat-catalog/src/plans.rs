use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use karat_core::store::{to_fields, validate_id};

use crate::schema::{check, lenient};
use crate::{remote, Scope};

pub const COLLECTION: &str = "investmentPlans";

/// A savings scheme offered by the shop. Tenure and amount are shown as
/// entered, e.g. `"11 months"` and `"5000"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPlan {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub tenure: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub amount: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlanInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "tenure is required"))]
    #[serde(deserialize_with = "lenient::text")]
    pub tenure: String,
    #[validate(length(min = 1, message = "amount is required"))]
    #[serde(deserialize_with = "lenient::text")]
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

impl PlanInput {
    fn prepare(mut self) -> anyhow::Result<Self> {
        self.name = self.name.trim().to_string();
        self.tenure = self.tenure.trim().to_string();
        self.amount = self.amount.trim().to_string();
        check(&self, "Investment plan validation failed")?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct PlansService {
    scope: Scope,
}

impl PlansService {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<InvestmentPlan>> {
        let store = self.scope.store()?;
        let docs = store.list(COLLECTION).await.map_err(remote)?;
        docs.into_iter()
            .map(|d| d.decode().map_err(remote))
            .collect()
    }

    pub async fn add(&self, input: PlanInput) -> anyhow::Result<InvestmentPlan> {
        let input = input.prepare()?;
        let store = self.scope.store()?;
        let doc = store
            .add(COLLECTION, to_fields(&input).map_err(remote)?)
            .await
            .map_err(remote)?;
        info!(plan = %doc.id, name = %input.name, "investment plan added");
        doc.decode().map_err(remote)
    }

    pub async fn update(&self, id: &str, input: PlanInput) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let input = input.prepare()?;
        let store = self.scope.store()?;
        store
            .update(COLLECTION, id, to_fields(&input).map_err(remote)?)
            .await
            .map_err(remote)?;
        info!(plan = %id, "investment plan updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<()> {
        validate_id(id).map_err(remote)?;
        let store = self.scope.store()?;
        store.delete(COLLECTION, id).await.map_err(remote)?;
        info!(plan = %id, "investment plan deleted");
        Ok(())
    }
}
