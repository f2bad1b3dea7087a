use crate::token::Identity;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: Identity,
    pub timestamp: String,
}

/// Only reachable through the access guard, which inserts the [`Identity`].
#[utoipa::path(
    get,
    path = "/protected",
    responses(
        (status = 200, description = "Caller identity resolved from the session token", body = ProtectedResponse),
        (status = 401, description = "Missing, expired, or invalid token", body = crate::api::handlers::auth::types::MessageResponse)
    ),
    security(
        ("session_cookie" = []),
        ("bearer" = [])
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn protected(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    debug!(user_id = identity.id, "Serving protected data");
    let body = ProtectedResponse {
        message: "This is protected data".to_string(),
        user: identity,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    (StatusCode::OK, Json(body))
}
