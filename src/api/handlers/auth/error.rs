use crate::token::TokenError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::types::MessageResponse;

pub(crate) const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
pub(crate) const ACCESS_DENIED_MESSAGE: &str = "Access denied";
pub(crate) const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Authentication failures that end a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong secret, or a token that failed verification.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Neither the cookie nor the bearer header carried a token.
    #[error("no credentials supplied")]
    NoCredentialsSupplied,
    /// The credential backend could not answer.
    #[error("credential store unavailable")]
    Store(#[source] anyhow::Error),
    /// Credentials matched but no token could be minted.
    #[error("failed to mint session token")]
    Mint(#[source] TokenError),
}

// Expired and malformed tokens are indistinguishable past this point.
impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        Self::InvalidCredentials
    }
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::NoCredentialsSupplied => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Mint(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render a login failure.
pub(crate) fn login_error_response(err: &AuthError) -> Response {
    let message = match err {
        AuthError::Store(_) | AuthError::Mint(_) => "Internal server error",
        AuthError::InvalidCredentials | AuthError::NoCredentialsSupplied => {
            INVALID_CREDENTIALS_MESSAGE
        }
    };
    (err.status(), Json(MessageResponse::new(message))).into_response()
}

/// Render a guard failure.
pub(crate) fn access_error_response(err: &AuthError) -> Response {
    let message = match err {
        AuthError::NoCredentialsSupplied => ACCESS_DENIED_MESSAGE,
        AuthError::InvalidCredentials => INVALID_TOKEN_MESSAGE,
        AuthError::Store(_) | AuthError::Mint(_) => "Internal server error",
    };
    (err.status(), Json(MessageResponse::new(message))).into_response()
}
