use crate::domain::order::VerifyPaymentRequest;
use crate::gateways::GatewayError;
use crate::http::middleware::auth::AuthUser;
use crate::service::order_service::FinalizeError;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct CreateGatewayOrderRequest {
    pub amount_minor: i64,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub message: String,
    #[serde(rename = "orderId")]
    pub order_id: uuid::Uuid,
}

/// Proxies order creation to the gateway and hands the client the gateway
/// order handle to pay against. The service never sees card details; the
/// client completes payment directly with the gateway.
pub async fn create_gateway_order(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Json(req): Json<CreateGatewayOrderRequest>,
) -> impl IntoResponse {
    if req.amount_minor <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "amount_minor must be > 0" })),
        )
            .into_response();
    }

    let currency = req.currency.unwrap_or_else(|| "INR".to_string());
    match state
        .order_service
        .gateway
        .create_order(req.amount_minor, &currency)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(GatewayError::Timeout) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "message": "Payment gateway timed out, please retry" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "gateway order creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Something went wrong" })),
            )
                .into_response()
        }
    }
}

/// Finalizer entry point: verify the signed payment claim and create the
/// paid order exactly once.
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<VerifyPaymentRequest>,
) -> impl IntoResponse {
    match state.order_service.finalize(user.user_id, req).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(VerifyPaymentResponse {
                message: "Order created successfully".to_string(),
                order_id: outcome.order.order_id,
            }),
        )
            .into_response(),
        Err(e) => finalize_error_response(e),
    }
}

fn finalize_error_response(e: FinalizeError) -> axum::response::Response {
    // Caller-fault errors are specific; gateway-side failures stay generic so
    // gateway internals never leak to clients.
    let (status, message) = match &e {
        FinalizeError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        FinalizeError::Signature => (StatusCode::BAD_REQUEST, "Invalid Signature".to_string()),
        FinalizeError::PaymentNotCompleted { .. } => (
            StatusCode::PAYMENT_REQUIRED,
            "Payment has not been captured yet".to_string(),
        ),
        FinalizeError::UpstreamTimeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "Payment gateway timed out, please retry".to_string(),
        ),
        FinalizeError::Upstream(_) | FinalizeError::Internal(_) => {
            tracing::error!(error = %e, "payment verification failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            )
        }
    };

    (status, Json(json!({ "message": message }))).into_response()
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
