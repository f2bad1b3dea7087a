//! Auth handlers and supporting modules.
//!
//! This module coordinates credential checks, token issuance and the access
//! guard in front of protected routes.
//!
//! ## Token channels
//!
//! A successful login delivers one token two ways:
//!
//! - **Cookie:** `jwt_token`, `HttpOnly`, `SameSite=Strict`, `Path=/`, with
//!   `Max-Age` equal to the session lifetime. `Secure` is added when the
//!   frontend is served over HTTPS.
//! - **Body:** the `token` field of the login response, for clients that send
//!   it back as `Authorization: Bearer <token>`.
//!
//! The guard reads the cookie first and falls back to the bearer header only
//! when no cookie value is present.
//!
//! > **Note:** Logout clears the cookie only. A bearer token kept by a client
//! > stays valid until it expires.

pub mod credentials;
mod error;
pub mod guard;
mod issuer;
pub mod session;
mod state;
pub mod types;

pub use credentials::{CredentialRecord, CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use error::AuthError;
pub use guard::{authorize, require_identity};
pub use issuer::{IssuedSession, SessionIssuer};
pub use session::SESSION_COOKIE_NAME;
pub use state::{AuthConfig, AuthState};
