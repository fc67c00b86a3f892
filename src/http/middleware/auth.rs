use crate::signature;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

/// Identity of the authenticated caller, injected as a request extension.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Clone)]
pub struct AuthState {
    pub token_secret: String,
}

/// Bearer tokens are `<user_uuid>.<hmac-hex>`, minted by the auth service
/// with the shared token secret. Issuance lives elsewhere; this only checks
/// the MAC and hands the user id to the handlers.
pub async fn require_bearer_token(
    State(auth): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("");

    let user_id = match parse_token(token, &auth.token_secret) {
        Some(user_id) => user_id,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Unauthorized" })),
            )
                .into_response();
        }
    };

    request.extensions_mut().insert(AuthUser { user_id });
    next.run(request).await
}

pub fn parse_token(token: &str, secret: &str) -> Option<Uuid> {
    let (user_part, mac_part) = token.split_once('.')?;
    let user_id = Uuid::parse_str(user_part).ok()?;

    if !signature::verify(user_part, "auth", mac_part, secret) {
        return None;
    }

    Some(user_id)
}

/// Token minting for the test harness and local tooling; the production auth
/// service issues these out of band.
pub fn mint_token(user_id: Uuid, secret: &str) -> String {
    let user_part = user_id.to_string();
    let mac = signature::sign(&user_part, "auth", secret);
    format!("{user_part}.{mac}")
}
