//! Token guard for protected routes.
//!
//! Flow Overview: take the token from the `jwt_token` cookie, or from an
//! `Authorization: Bearer` header when no cookie is present, verify it, and
//! attach the resulting [`Identity`] to the request extensions. Any failure
//! answers 401 here; downstream handlers only ever run with an identity.

use crate::token::{Identity, TokenCodec};
use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    error::{AuthError, access_error_response},
    session::extract_session_token,
    state::AuthState,
};

/// Resolve the request headers into a verified identity.
///
/// # Errors
///
/// Returns [`AuthError::NoCredentialsSupplied`] when neither channel carries a
/// token and [`AuthError::InvalidCredentials`] when verification fails.
pub fn authorize(codec: &TokenCodec, headers: &HeaderMap) -> Result<Identity, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        debug!("No token found, access denied");
        return Err(AuthError::NoCredentialsSupplied);
    };

    codec.verify(&token).map_err(|err| {
        debug!("Token verification failed: {err}");
        AuthError::from(err)
    })
}

/// `axum::middleware::from_fn` layer guarding protected routes.
pub async fn require_identity(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(auth_state.codec(), request.headers()) {
        Ok(identity) => {
            debug!(user_id = identity.id, "Token verified");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => access_error_response(&err),
    }
}
