//! Client half of the session protocol.
//!
//! [`ClientSessionStore`] keeps the signed-in user and tells subscribers when
//! it changes, [`RouteAccessPolicy`] gates navigation on it, and
//! [`AuthClient`] talks to the server, attaching the stored bearer token.

mod api;
mod error;
pub mod form;
mod policy;
mod session;
pub mod storage;

pub use api::AuthClient;
pub use error::ClientError;
pub use policy::{DEFAULT_LANDING_PATH, LOGIN_PATH, Navigation, RETURN_URL_PARAM, RouteAccessPolicy};
pub use session::{CURRENT_USER_KEY, ClientSessionStore, LoginPayload, StoredUser, Subscription};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
