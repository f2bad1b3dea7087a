//! # Tokengate
//!
//! `tokengate` issues signed, self-contained session tokens and checks them on
//! protected routes. One login yields one token, delivered on two channels:
//!
//! - an `HttpOnly` cookie (`jwt_token`) the browser sends back on its own, and
//! - a JSON body field a client stores and replays as `Authorization: Bearer`.
//!
//! The access guard accepts either channel, cookie first.
//!
//! ## Crate layout
//!
//! - [`token`]: minting and verifying HS256 tokens.
//! - [`api`]: the axum server, its handlers and the access guard.
//! - [`client`]: the client half; session state with change notification,
//!   route access rules, and an HTTP client that attaches the bearer token.
//! - [`cli`]: argument parsing, telemetry and server startup.
//!
//! ## Revocation
//!
//! There is none. Tokens are valid until `exp`; logout only clears the cookie
//! and the client's own copy.

pub mod api;
pub mod cli;
pub mod client;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
