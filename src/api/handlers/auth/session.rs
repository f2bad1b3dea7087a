//! Session endpoints and the two token channels.
//!
//! A login answers with the same token twice: once in an `HttpOnly` cookie the
//! browser manages, once in the JSON body for clients that keep the token
//! themselves and send it back as a bearer header.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    error::login_error_response,
    state::{AuthConfig, AuthState},
    types::{LoginRequest, LoginResponse, MessageResponse},
};

pub const SESSION_COOKIE_NAME: &str = "jwt_token";

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued; token set as cookie and returned in the body", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected login payload: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new("Invalid request body")),
            )
                .into_response();
        }
    };

    let session = match auth_state
        .issuer()
        .login(&request.username, &request.secret)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            if err.status().is_server_error() {
                error!("Login failed: {err:#}");
            }
            return login_error_response(&err);
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), session.token.as_str()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new("Internal server error")),
            )
                .into_response();
        }
    }

    let body = LoginResponse {
        message: "Login successful".to_string(),
        token: session.token.into_string(),
        user: session.identity,
    };

    (StatusCode::OK, headers, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> Response {
    // Bearer tokens held by the client stay valid until they expire; only the
    // cookie channel can be revoked from here.
    let mut headers = HeaderMap::new();
    match clear_session_cookie(auth_state.config()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }

    (
        StatusCode::OK,
        headers,
        Json(MessageResponse::new("Logged out successfully")),
    )
        .into_response()
}

/// Build the `HttpOnly` session cookie carrying `token`.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Find the session token, preferring the cookie over the bearer header.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie_token(headers).or_else(|| extract_bearer_token(headers))
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim())
        })
        .find(|val| !val.is_empty())
        .map(str::to_string)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn headers_with(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn session_cookie_attributes() -> Result<()> {
        let config = AuthConfig::default();
        let cookie = session_cookie(&config, "abc.def.ghi")?;
        assert_eq!(
            cookie.to_str()?,
            "jwt_token=abc.def.ghi; Path=/; HttpOnly; SameSite=Strict; Max-Age=3600"
        );
        Ok(())
    }

    #[test]
    fn session_cookie_is_secure_over_https() -> Result<()> {
        let config = AuthConfig::new("https://app.tokengate.dev".to_string())
            .with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "t")?;
        let cookie = cookie.to_str()?;
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = clear_session_cookie(&config)?;
        assert!(cleared.to_str()?.ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<()> {
        let cookie = clear_session_cookie(&AuthConfig::default())?;
        assert_eq!(
            cookie.to_str()?,
            "jwt_token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
        );
        Ok(())
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let headers = headers_with(&[
            ("cookie", "theme=dark; jwt_token=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(
            extract_session_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn bearer_used_when_cookie_missing_or_empty() {
        let headers = headers_with(&[("authorization", "Bearer from-header")]);
        assert_eq!(
            extract_session_token(&headers),
            Some("from-header".to_string())
        );

        let headers = headers_with(&[
            ("cookie", "jwt_token="),
            ("authorization", "bearer from-header"),
        ]);
        assert_eq!(
            extract_session_token(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn bearer_scheme_ignores_case() {
        for value in ["BEARER upper", "bEaReR upper", "Bearer   upper"] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            assert_eq!(
                extract_session_token(&headers),
                Some("upper".to_string()),
                "{value}"
            );
        }

        let headers = headers_with(&[("authorization", "Bearerupper")]);
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn cookie_found_across_split_headers() {
        let headers = headers_with(&[("cookie", "a=1"), ("cookie", "jwt_token=second")]);
        assert_eq!(extract_session_token(&headers), Some("second".to_string()));
    }

    #[test]
    fn nothing_supplied() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);

        let headers = headers_with(&[
            ("cookie", "other_token=x"),
            ("authorization", "Basic dXNlcjpwYXNz"),
        ]);
        assert_eq!(extract_session_token(&headers), None);

        let headers = headers_with(&[("authorization", "Bearer   ")]);
        assert_eq!(extract_session_token(&headers), None);
    }
}
