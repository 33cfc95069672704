//! Referral partners and their earnings, keyed by mobile number.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use karat_core::store::{to_fields, validate_id, WriteMode};
use karat_core::KaratError;

use crate::schema::{check, lenient};
use crate::{remote, Scope};

pub const COLLECTION: &str = "partnerusers";

/// One stored history row. Older rows may lack fields, so reads are
/// lenient; new rows come from [`EarningInput`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EarningEntry {
    #[serde(default, deserialize_with = "lenient::number")]
    pub bill_amount: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub earning_amount: f64,
    /// `dd/mm/yyyy`
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub remark: String,
}

/// The earning form. Both amounts and the date must be filled in.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EarningInput {
    #[serde(deserialize_with = "lenient::required_number")]
    pub bill_amount: f64,
    #[serde(deserialize_with = "lenient::required_number")]
    pub earning_amount: f64,
    #[validate(length(min = 1, message = "date is required"))]
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub remark: String,
}

impl EarningInput {
    pub fn new(bill_amount: f64, earning_amount: f64, date: impl Into<String>) -> Self {
        Self {
            bill_amount,
            earning_amount,
            date: date.into(),
            remark: String::new(),
        }
    }

    fn prepare(mut self) -> anyhow::Result<EarningEntry> {
        self.date = self.date.trim().to_string();
        check(&self, "Earning validation failed")?;
        if !self.bill_amount.is_finite() || !self.earning_amount.is_finite() {
            return Err(KaratError::unprocessable("Amounts must be numbers").into_anyhow());
        }
        Ok(EarningEntry {
            bill_amount: self.bill_amount,
            earning_amount: self.earning_amount,
            date: self.date,
            remark: self.remark.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mobile: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_earning: f64,
    #[serde(default)]
    pub history: Vec<EarningEntry>,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Newest first. Entries whose date cannot be read go last, in their
/// stored order.
pub fn sort_history(history: &mut [EarningEntry]) {
    history.sort_by(|a, b| match (parse_date(&a.date), parse_date(&b.date)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[derive(Clone)]
pub struct PartnersService {
    scope: Scope,
}

impl PartnersService {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// The partner registered under `mobile`, history sorted newest first.
    pub async fn fetch(&self, mobile: &str) -> anyhow::Result<Option<Partner>> {
        let mobile = checked_mobile(mobile)?;
        let store = self.scope.store()?;
        let Some(doc) = store.get(COLLECTION, mobile).await.map_err(remote)? else {
            return Ok(None);
        };
        let mut partner: Partner = doc.decode().map_err(remote)?;
        if partner.mobile.is_empty() {
            partner.mobile = mobile.to_string();
        }
        sort_history(&mut partner.history);
        Ok(Some(partner))
    }

    /// Add an earning, creating the partner on first use.
    pub async fn record_earning(&self, mobile: &str, input: EarningInput) -> anyhow::Result<Partner> {
        let mobile = checked_mobile(mobile)?;
        let entry = input.prepare()?;

        let store = self.scope.store()?;
        let existing = store.get(COLLECTION, mobile).await.map_err(remote)?;

        let mut partner = match existing {
            None => {
                let partner = Partner {
                    name: String::new(),
                    mobile: mobile.to_string(),
                    total_earning: entry.earning_amount,
                    history: vec![entry],
                };
                let fields = to_fields(&json!({
                    "name": partner.name,
                    "mobile": partner.mobile,
                    "totalEarning": partner.total_earning,
                    "history": partner.history,
                }))
                .map_err(remote)?;
                store
                    .set(COLLECTION, mobile, fields, WriteMode::Replace)
                    .await
                    .map_err(remote)?;
                info!(partner = %mobile, "partner created with first earning");
                partner
            }
            Some(doc) => {
                let mut partner: Partner = doc.decode().map_err(remote)?;
                partner.total_earning += entry.earning_amount;
                partner.history.push(entry);
                let fields = to_fields(&json!({
                    "history": partner.history,
                    "totalEarning": partner.total_earning,
                }))
                .map_err(remote)?;
                store.update(COLLECTION, mobile, fields).await.map_err(remote)?;
                info!(partner = %mobile, total = partner.total_earning, "earning recorded");
                partner
            }
        };

        if partner.mobile.is_empty() {
            partner.mobile = mobile.to_string();
        }
        sort_history(&mut partner.history);
        Ok(partner)
    }
}

fn checked_mobile(mobile: &str) -> anyhow::Result<&str> {
    let mobile = mobile.trim();
    if mobile.is_empty() {
        return Err(KaratError::bad_request("Enter mobile number").into_anyhow());
    }
    validate_id(mobile).map_err(remote)?;
    Ok(mobile)
}
