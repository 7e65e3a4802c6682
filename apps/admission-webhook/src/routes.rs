// [apps/admission-webhook/src/routes.rs]
/*!
 * APARATO: ADMISSION WEBHOOK ROUTER (ESTRATO L1-APP)
 * RESPONSABILIDAD: ENDPOINTS HTTP DEL WEBHOOK DE ADMISION
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chutes_admission_core::model::AdmissionReview;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/validate", post(validate))
        .route("/mutate", post(mutate))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn validate(State(state): State<AppState>, body: axum::body::Bytes) -> impl IntoResponse {
    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("malformed AdmissionReview: {err}")).into_response();
        }
    };

    let Some(request) = review.request else {
        return (StatusCode::BAD_REQUEST, "AdmissionReview is missing `request`").into_response();
    };

    let response = state.controller.validate(request).await;
    Json(AdmissionReview {
        api_version: review.api_version,
        kind: review.kind,
        request: None,
        response: Some(response),
    })
    .into_response()
}

/// Siempre permite: el origen nunca implemento logica de mutacion real.
async fn mutate(body: axum::body::Bytes) -> impl IntoResponse {
    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("malformed AdmissionReview: {err}")).into_response();
        }
    };

    let Some(request) = review.request else {
        return (StatusCode::BAD_REQUEST, "AdmissionReview is missing `request`").into_response();
    };

    Json(AdmissionReview {
        api_version: review.api_version,
        kind: review.kind,
        request: None,
        response: Some(chutes_admission_core::model::ValidationResult::allow().into_response(&request.uid)),
    })
    .into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    health_report(state).await
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    health_report(state).await
}

async fn health_report(state: AppState) -> impl IntoResponse {
    let report = state.controller.health().await;
    let status = if report.healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report.validators))
}

async fn metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        chutes_admission_core::metrics::encode_text(),
    )
}
