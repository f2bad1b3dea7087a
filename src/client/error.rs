use super::form::FormError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Longest server message kept in an error.
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

impl ClientError {
    /// Map a non-success response; the server's `{message}` is used when present.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = server_message(body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::BAD_REQUEST => Self::BadRequest(message),
            status if status.is_server_error() => Self::Server { status, message },
            status => Self::InvalidResponse(format!("Status {status}: {message}")),
        }
    }
}

fn server_message(body: &str) -> String {
    let message = serde_json::from_str::<MessageBody>(body)
        .map(|body| body.message)
        .unwrap_or_else(|_| body.to_string());

    if message.len() <= MAX_ERROR_BODY_LENGTH {
        message
    } else {
        let cut = (0..=MAX_ERROR_BODY_LENGTH)
            .rev()
            .find(|&index| message.is_char_boundary(index))
            .unwrap_or(0);
        format!("{}... (truncated, {} total bytes)", &message[..cut], message.len())
    }
}
