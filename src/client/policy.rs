//! Navigation gate for client routes that need a signed-in user.
//!
//! This is a convenience for the client only. The server's access guard is
//! what actually protects data.

use url::form_urlencoded;

use super::session::ClientSessionStore;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";
pub const RETURN_URL_PARAM: &str = "returnUrl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect { to: String },
}

#[derive(Debug, Clone)]
pub struct RouteAccessPolicy {
    session: ClientSessionStore,
}

impl RouteAccessPolicy {
    #[must_use]
    pub fn new(session: ClientSessionStore) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn can_enter(&self) -> bool {
        self.session.is_signed_in()
    }

    /// Decide whether `requested` may be entered; otherwise send the user to
    /// the login page with `requested` kept as `returnUrl`.
    #[must_use]
    pub fn check(&self, requested: &str) -> Navigation {
        if self.can_enter() {
            return Navigation::Allow;
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(RETURN_URL_PARAM, requested)
            .finish();
        Navigation::Redirect {
            to: format!("{LOGIN_PATH}?{query}"),
        }
    }

    /// For the login page: a user who is already signed in moves on.
    #[must_use]
    pub fn redirect_if_signed_in(&self) -> Navigation {
        if self.can_enter() {
            Navigation::Redirect {
                to: DEFAULT_LANDING_PATH.to_string(),
            }
        } else {
            Navigation::Allow
        }
    }

    /// Where to go after a successful login, given the login page's query
    /// string. Only local absolute paths are honoured.
    #[must_use]
    pub fn resume_target(query: &str) -> String {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == RETURN_URL_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|target| is_local_path(target))
            .unwrap_or_else(|| DEFAULT_LANDING_PATH.to_string())
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
