//! HTTP API: router and handlers.

pub mod health;
pub mod rates;

use crate::service::RateService;
use crate::validator::CurrencyValidator;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RateService>,
    pub validator: Arc<CurrencyValidator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/rates/updates", post(rates::schedule_update))
        .route("/api/v1/rates/updates/{id}", get(rates::get_by_update_id))
        .route(
            "/api/v1/rates/supported-currencies",
            get(rates::get_supported_codes),
        )
        .route("/api/v1/rates/{base}/{quote}", get(rates::get_by_codes))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}
