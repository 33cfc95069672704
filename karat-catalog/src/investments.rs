use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use karat_core::store::{validate_id, Fields, StoreError};

use crate::schema::{check, lenient};
use crate::{remote, Scope};

pub const COLLECTION: &str = "investments";

/// One instalment paid against a customer investment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    #[validate(length(min = 1, message = "month is required"))]
    #[serde(default, deserialize_with = "lenient::text")]
    pub month: String,
    #[validate(length(min = 1, message = "amount is required"))]
    #[serde(default, deserialize_with = "lenient::text")]
    pub amount: String,
    #[validate(length(min = 1, message = "date is required"))]
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: String,
    #[validate(length(min = 1, message = "accountName is required"))]
    #[serde(default, deserialize_with = "lenient::text")]
    pub account_name: String,
    /// Always written, blank when the operator left it empty.
    #[serde(default, deserialize_with = "lenient::text")]
    pub remark: String,
}

/// A customer's enrolment in a plan. Written by the customer app; the
/// console only appends payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub plan_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_mobile: String,
    #[serde(default, deserialize_with = "lenient::opt_text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub payment_history: Vec<PaymentEntry>,
}

#[derive(Clone)]
pub struct InvestmentsService {
    scope: Scope,
}

impl InvestmentsService {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Investment>> {
        let store = self.scope.store()?;
        let docs = store.list(COLLECTION).await.map_err(remote)?;
        docs.into_iter()
            .map(|d| d.decode().map_err(remote))
            .collect()
    }

    /// Append `entry` to the payment history of investment `id`.
    pub async fn record_payment(&self, id: &str, mut entry: PaymentEntry) -> anyhow::Result<Investment> {
        validate_id(id).map_err(remote)?;
        entry.month = entry.month.trim().to_string();
        entry.amount = entry.amount.trim().to_string();
        entry.date = entry.date.trim().to_string();
        entry.account_name = entry.account_name.trim().to_string();
        entry.remark = entry.remark.trim().to_string();
        check(&entry, "Payment validation failed")?;

        let store = self.scope.store()?;
        let doc = store
            .get(COLLECTION, id)
            .await
            .map_err(remote)?
            .ok_or_else(|| remote(StoreError::not_found(COLLECTION, id)))?;
        let mut investment: Investment = doc.decode().map_err(remote)?;
        investment.payment_history.push(entry);

        let mut fields = Fields::new();
        fields.insert(
            "paymentHistory".into(),
            serde_json::to_value(&investment.payment_history)?,
        );
        store.update(COLLECTION, id, fields).await.map_err(remote)?;

        info!(
            investment = %id,
            payments = investment.payment_history.len(),
            "payment recorded"
        );
        Ok(investment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::bound;
    use karat_core::{DocumentStore, ErrorKind, KaratError, WriteMode};
    use serde_json::json;

    fn entry(month: &str) -> PaymentEntry {
        PaymentEntry {
            month: month.into(),
            amount: "5000".into(),
            date: "05/01/2026".into(),
            account_name: "Cash counter".into(),
            remark: String::new(),
        }
    }

    #[tokio::test]
    async fn payment_is_appended() {
        let fx = bound();
        let seed = json!({
            "planName": "Gold Saver",
            "userMobile": "9876543210",
            "createdAt": "2025-12-01T00:00:00Z",
            "paymentHistory": [{"month": "December", "amount": 5000, "date": "01/12/2025", "accountName": "UPI"}]
        });
        fx.store
            .set(COLLECTION, "inv-1", seed.as_object().cloned().unwrap(), WriteMode::Replace)
            .await
            .unwrap();

        let svc = InvestmentsService::new(fx.scope);
        let updated = svc.record_payment("inv-1", entry("January")).await.unwrap();
        assert_eq!(updated.payment_history.len(), 2);
        assert_eq!(updated.payment_history[0].amount, "5000");
        assert_eq!(updated.payment_history[1].month, "January");

        let listed = svc.list().await.unwrap();
        assert_eq!(listed[0].payment_history, updated.payment_history);
        assert_eq!(listed[0].user_mobile, "9876543210");

        let stored = fx.store.get(COLLECTION, "inv-1").await.unwrap().unwrap();
        assert_eq!(stored.fields["paymentHistory"][1]["remark"], json!(""));
    }

    #[tokio::test]
    async fn first_payment_starts_history() {
        let fx = bound();
        let seed = json!({"planName": "Silver", "userMobile": "9000000000"});
        fx.store
            .set(COLLECTION, "inv-2", seed.as_object().cloned().unwrap(), WriteMode::Replace)
            .await
            .unwrap();

        let svc = InvestmentsService::new(fx.scope);
        let updated = svc.record_payment("inv-2", entry("March")).await.unwrap();
        assert_eq!(updated.payment_history.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_or_investment_fail() {
        let fx = bound();
        let svc = InvestmentsService::new(fx.scope);

        let mut bad = entry("May");
        bad.account_name = " ".into();
        let err = svc.record_payment("inv-1", bad).await.unwrap_err();
        assert_eq!(KaratError::find_in(&err).map(|e| e.kind), Some(ErrorKind::Unprocessable));

        let err = svc.record_payment("ghost", entry("May")).await.unwrap_err();
        assert_eq!(KaratError::find_in(&err).map(|e| e.kind), Some(ErrorKind::NotFound));
    }
}
