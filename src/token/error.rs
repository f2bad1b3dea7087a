use thiserror::Error;

/// Failures surfaced by [`super::TokenCodec`].
///
/// Callers at the HTTP boundary must collapse `Expired` and `Malformed` into
/// one generic denial; the split only exists for logging and tests.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to encode token")]
    Encoding,
}

/// Configuration errors raised while building a codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("invalid signing key")]
    InvalidKey,
}
