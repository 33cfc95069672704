pub mod catalog;
pub mod session;

use axum::routing::{get, post};
use axum::Router;

use crate::ConsoleState;

/// All console routes, bound to `state`.
pub fn router(state: ConsoleState) -> Router<()> {
    Router::new()
        .route("/health", get(session::health))
        .route("/session", get(session::current))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/dashboard", get(session::dashboard))
        .route("/categories", get(catalog::list_categories).post(catalog::add_category))
        .route(
            "/categories/{id}",
            axum::routing::put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/products", get(catalog::list_products).post(catalog::add_product))
        .route(
            "/products/{id}",
            axum::routing::put(catalog::update_product).delete(catalog::delete_product),
        )
        .route("/investment-plans", get(catalog::list_plans).post(catalog::add_plan))
        .route(
            "/investment-plans/{id}",
            axum::routing::put(catalog::update_plan).delete(catalog::delete_plan),
        )
        .route("/investments", get(catalog::list_investments))
        .route("/investments/{id}/payments", post(catalog::record_payment))
        .route("/partners/{mobile}", get(catalog::fetch_partner))
        .route("/partners/{mobile}/earnings", post(catalog::record_earning))
        .route(
            "/rates",
            get(catalog::get_rates)
                .post(catalog::add_rates)
                .put(catalog::save_rates)
                .patch(catalog::update_rates)
                .delete(catalog::delete_rates),
        )
        .route("/users", get(catalog::list_users))
        .with_state(state)
}
