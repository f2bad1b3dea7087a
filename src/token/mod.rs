//! Stateless session tokens.
//!
//! A token is a compact HS256 JWS over `{id, username, iat, exp}`. Verification
//! needs nothing but the signing secret, so there is no server-side session
//! table and no revocation: a token dies when its `exp` passes.

mod error;
mod jwt;

pub use error::{KeyError, TokenError};
pub(crate) use jwt::now_unix_seconds;
pub use jwt::{Identity, Token, TokenClaims, TokenCodec};
