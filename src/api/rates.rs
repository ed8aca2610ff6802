//! Rate endpoints.
//!
//! Codes are normalized (trim + uppercase) here, before validation; the
//! validator and service only ever see canonical codes.

use super::AppState;
use crate::db::repo::RepoError;
use crate::domain::{RateView, UpdateStatus};
use crate::error::AppError;
use crate::service::ServiceError;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

/// Schedule requests are tiny; anything larger is rejected outright.
const MAX_SCHEDULE_BODY_BYTES: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleUpdateRequest {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleUpdateResponse {
    pub update_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UpdateViewResponse {
    pub update_id: Uuid,
    pub base: String,
    pub quote: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub base: String,
    pub quote: String,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SupportedCodesResponse {
    pub codes: Vec<String>,
}

pub async fn schedule_update(State(state): State<AppState>, body: Bytes) -> Response {
    if body.len() > MAX_SCHEDULE_BODY_BYTES {
        return AppError::BadRequest("invalid request body".into()).into_response();
    }

    let request: ScheduleUpdateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return AppError::BadRequest("invalid request body".into()).into_response(),
    };

    let base = normalize_code(&request.base);
    let quote = normalize_code(&request.quote);

    if let Err(err) = state.validator.validate(&base, &quote) {
        return AppError::BadRequest(err.to_string()).into_response();
    }

    match state.service.schedule_update(&base, &quote).await {
        Ok(update_id) => (
            StatusCode::ACCEPTED,
            Json(ScheduleUpdateResponse { update_id }),
        )
            .into_response(),
        Err(err) => {
            error!(handler = "schedule_update", %base, %quote, error = %err, "update wasn't scheduled");
            AppError::Internal("failed to schedule rate update".into()).into_response()
        }
    }
}

pub async fn get_by_update_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Response {
    let Ok(update_id) = Uuid::parse_str(&raw_id) else {
        return AppError::BadRequest("invalid update ID format".into()).into_response();
    };

    match state.service.get_by_update_id(update_id).await {
        Ok(RateView::Applied {
            base,
            quote,
            value,
            updated_at,
        }) => (
            StatusCode::OK,
            Json(UpdateViewResponse {
                update_id,
                base,
                quote,
                status: UpdateStatus::Applied.as_str(),
                value: Some(value),
                updated_at: Some(updated_at),
            }),
        )
            .into_response(),
        Ok(RateView::Pending { base, quote }) => (
            StatusCode::ACCEPTED,
            Json(UpdateViewResponse {
                update_id,
                base,
                quote,
                status: UpdateStatus::Pending.as_str(),
                value: None,
                updated_at: None,
            }),
        )
            .into_response(),
        Err(ServiceError::Repo(RepoError::RateNotFound)) => {
            AppError::NotFound("rate update not found".into()).into_response()
        }
        Err(err) => {
            error!(handler = "get_by_update_id", %update_id, error = %err, "couldn't get rate by update id");
            AppError::Internal("failed to get rate by update id".into()).into_response()
        }
    }
}

pub async fn get_by_codes(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
) -> Response {
    let base = normalize_code(&base);
    let quote = normalize_code(&quote);

    if let Err(err) = state.validator.validate(&base, &quote) {
        return AppError::BadRequest(err.to_string()).into_response();
    }

    match state.service.get_by_codes(&base, &quote).await {
        Ok(rate) => (
            StatusCode::OK,
            Json(RateResponse {
                base: rate.base,
                quote: rate.quote,
                value: rate.value,
                updated_at: rate.updated_at,
            }),
        )
            .into_response(),
        Err(ServiceError::Repo(RepoError::RateNotFound)) => {
            AppError::NotFound("rate not found".into()).into_response()
        }
        Err(err) => {
            error!(handler = "get_by_codes", %base, %quote, error = %err, "couldn't get rate by codes");
            AppError::Internal("failed to get rate by codes".into()).into_response()
        }
    }
}

pub async fn get_supported_codes(State(state): State<AppState>) -> Json<SupportedCodesResponse> {
    Json(SupportedCodesResponse {
        codes: state.validator.supported_codes(),
    })
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code_trims_and_uppercases() {
        assert_eq!(normalize_code(" usd "), "USD");
        assert_eq!(normalize_code("EUR"), "EUR");
        assert_eq!(normalize_code("\teur\n"), "EUR");
    }

    #[test]
    fn test_pending_view_omits_numeric_fields() {
        let response = UpdateViewResponse {
            update_id: Uuid::new_v4(),
            base: "USD".to_string(),
            quote: "EUR".to_string(),
            status: "pending",
            value: None,
            updated_at: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        let fields = json.as_object().unwrap();
        assert!(!fields.contains_key("value"));
        assert!(!fields.contains_key("updated_at"));
    }
}
