//! Feature endpoints. Every handler requires a logged-in shop and runs its
//! store work under the session guard.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use karat_catalog::schema::validate;
use karat_catalog::{
    Category, CategoryInput, EarningInput, Investment, InvestmentPlan, MetalRates, Partner,
    PaymentEntry, PlanInput, Product, ProductInput, RatesPatch, User,
};
use karat_core::KaratError;
use serde::Deserialize;
use serde_json::Value;

use crate::error::map_json_rejection;
use crate::state::{Authenticated, ConsoleState};
use crate::KaratAxumError;

type Body = Result<Json<Value>, JsonRejection>;
type Reply<T> = Result<Json<T>, KaratAxumError>;
type Done = Result<StatusCode, KaratAxumError>;

fn payload(data: Body) -> Result<Value, KaratAxumError> {
    data.map(|Json(v)| v).map_err(map_json_rejection)
}

pub async fn list_categories(State(state): State<ConsoleState>, _: Authenticated) -> Reply<Vec<Category>> {
    Ok(Json(state.guarded(state.catalog.categories.list()).await?))
}

pub async fn add_category(
    State(state): State<ConsoleState>,
    _: Authenticated,
    data: Body,
) -> Result<(StatusCode, Json<Category>), KaratAxumError> {
    let input: CategoryInput = validate(payload(data)?, "Invalid category")?;
    let created = state.guarded(state.catalog.categories.add(input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(id): Path<String>,
    data: Body,
) -> Done {
    let input: CategoryInput = validate(payload(data)?, "Invalid category")?;
    state.guarded(state.catalog.categories.update(&id, input)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_category(State(state): State<ConsoleState>, _: Authenticated, Path(id): Path<String>) -> Done {
    state.guarded(state.catalog.categories.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default)]
    pub category_id: String,
}

pub async fn list_products(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Query(query): Query<ProductQuery>,
) -> Reply<Vec<Product>> {
    let products = state
        .guarded(state.catalog.products.list_by_category(&query.category_id))
        .await?;
    Ok(Json(products))
}

pub async fn add_product(
    State(state): State<ConsoleState>,
    _: Authenticated,
    data: Body,
) -> Result<(StatusCode, Json<Product>), KaratAxumError> {
    let input: ProductInput = validate(payload(data)?, "Invalid product")?;
    let created = state.guarded(state.catalog.products.add(input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(id): Path<String>,
    data: Body,
) -> Done {
    let input: ProductInput = validate(payload(data)?, "Invalid product")?;
    state.guarded(state.catalog.products.update(&id, input)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_product(State(state): State<ConsoleState>, _: Authenticated, Path(id): Path<String>) -> Done {
    state.guarded(state.catalog.products.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_plans(State(state): State<ConsoleState>, _: Authenticated) -> Reply<Vec<InvestmentPlan>> {
    Ok(Json(state.guarded(state.catalog.plans.list()).await?))
}

pub async fn add_plan(
    State(state): State<ConsoleState>,
    _: Authenticated,
    data: Body,
) -> Result<(StatusCode, Json<InvestmentPlan>), KaratAxumError> {
    let input: PlanInput = validate(payload(data)?, "Invalid investment plan")?;
    let created = state.guarded(state.catalog.plans.add(input)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_plan(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(id): Path<String>,
    data: Body,
) -> Done {
    let input: PlanInput = validate(payload(data)?, "Invalid investment plan")?;
    state.guarded(state.catalog.plans.update(&id, input)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_plan(State(state): State<ConsoleState>, _: Authenticated, Path(id): Path<String>) -> Done {
    state.guarded(state.catalog.plans.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_investments(State(state): State<ConsoleState>, _: Authenticated) -> Reply<Vec<Investment>> {
    Ok(Json(state.guarded(state.catalog.investments.list()).await?))
}

pub async fn record_payment(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(id): Path<String>,
    data: Body,
) -> Reply<Investment> {
    let entry: PaymentEntry = validate(payload(data)?, "Invalid payment")?;
    let updated = state
        .guarded(state.catalog.investments.record_payment(&id, entry))
        .await?;
    Ok(Json(updated))
}

pub async fn fetch_partner(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(mobile): Path<String>,
) -> Reply<Partner> {
    match state.guarded(state.catalog.partners.fetch(&mobile)).await? {
        Some(partner) => Ok(Json(partner)),
        None => Err(KaratError::not_found("Partner not found").into()),
    }
}

pub async fn record_earning(
    State(state): State<ConsoleState>,
    _: Authenticated,
    Path(mobile): Path<String>,
    data: Body,
) -> Reply<Partner> {
    let entry: EarningInput = validate(payload(data)?, "Invalid earning")?;
    let partner = state
        .guarded(state.catalog.partners.record_earning(&mobile, entry))
        .await?;
    Ok(Json(partner))
}

pub async fn get_rates(State(state): State<ConsoleState>, _: Authenticated) -> Reply<Option<MetalRates>> {
    Ok(Json(state.guarded(state.catalog.rates.get()).await?))
}

pub async fn add_rates(State(state): State<ConsoleState>, _: Authenticated, data: Body) -> Done {
    let rates: MetalRates = validate(payload(data)?, "Invalid metal rates")?;
    if state.guarded(state.catalog.rates.add(rates)).await? {
        Ok(StatusCode::CREATED)
    } else {
        Err(KaratError::conflict("Metal rates already exist").into())
    }
}

pub async fn update_rates(State(state): State<ConsoleState>, _: Authenticated, data: Body) -> Done {
    let patch: RatesPatch = validate(payload(data)?, "Invalid metal rates")?;
    state.guarded(state.catalog.rates.update(patch)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn save_rates(State(state): State<ConsoleState>, _: Authenticated, data: Body) -> Done {
    let rates: MetalRates = validate(payload(data)?, "Invalid metal rates")?;
    state.guarded(state.catalog.rates.save(rates)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_rates(State(state): State<ConsoleState>, _: Authenticated) -> Done {
    state.guarded(state.catalog.rates.delete()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(State(state): State<ConsoleState>, _: Authenticated) -> Reply<Vec<User>> {
    Ok(Json(state.guarded(state.catalog.users.list()).await?))
}
