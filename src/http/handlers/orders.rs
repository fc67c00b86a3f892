use crate::http::middleware::auth::AuthUser;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;
use uuid::Uuid;

pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match state.orders.list_for_user(user.user_id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list orders");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Something went wrong" })),
            )
                .into_response()
        }
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.orders.find_by_id(order_id, user.user_id).await {
        Ok(Some(order)) => (StatusCode::OK, Json(order)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Order not found" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Something went wrong" })),
            )
                .into_response()
        }
    }
}
