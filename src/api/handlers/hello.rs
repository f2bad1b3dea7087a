use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HelloResponse {
    pub message: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/hello",
    responses(
        (status = 200, description = "Public greeting", body = HelloResponse)
    ),
    tag = "tokengate"
)]
pub async fn hello() -> impl IntoResponse {
    let body = HelloResponse {
        message: "Hello from the server!".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    (StatusCode::OK, Json(body))
}
