use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use karat_auth::Navigation;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::map_json_rejection;
use crate::state::{Authenticated, ConsoleState};
use crate::KaratAxumError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub shop_id: String,
    #[serde(default)]
    pub password: String,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn current(State(state): State<ConsoleState>) -> Json<Value> {
    match state.session.current_params() {
        Some(params) => Json(json!({
            "authenticated": true,
            "shopName": params.shop_name,
        })),
        None => Json(json!({ "authenticated": false })),
    }
}

pub async fn login(
    State(state): State<ConsoleState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, KaratAxumError> {
    let Json(req) = body.map_err(map_json_rejection)?;
    let params = state.session.sign_in(&req.shop_id, &req.password).await?;
    Ok(Json(json!({
        "authenticated": true,
        "shopName": params.shop_name,
        "redirect": Navigation::Dashboard.path(),
    })))
}

pub async fn logout(State(state): State<ConsoleState>) -> Result<Json<Value>, KaratAxumError> {
    let next = state.session.logout()?;
    info!("operator logged out");
    Ok(Json(json!({
        "authenticated": false,
        "redirect": next.path(),
    })))
}

pub async fn dashboard(
    State(state): State<ConsoleState>,
    Authenticated(params): Authenticated,
) -> Json<karat_catalog::DashboardView> {
    Json(state.catalog.dashboard.view(&params))
}
