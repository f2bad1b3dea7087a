//! HTTP client for the tokengate API.
//!
//! Cookies returned by the server are kept in the client's cookie jar, and the
//! bearer token from the session store, when there is one, is attached to
//! every request. Either is enough for the access guard.

use crate::{
    APP_USER_AGENT,
    api::handlers::{auth::types::LoginRequest, hello::HelloResponse, protected::ProtectedResponse},
    token::Identity,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    error::ClientError,
    form::validate_login,
    session::{ClientSessionStore, LoginPayload},
};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Clone is cheap; clones share the connection pool, cookie jar and session.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Url,
    session: ClientSessionStore,
}

impl AuthClient {
    /// # Errors
    /// Returns an error if `base_url` does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str, session: ClientSessionStore) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            session,
        })
    }

    #[must_use]
    pub fn session(&self) -> &ClientSessionStore {
        &self.session
    }

    /// Sign in and adopt the returned user into the session store.
    ///
    /// # Errors
    /// Returns [`ClientError::Form`] before any request when the input is
    /// unusable, [`ClientError::InvalidCredentials`] on a 401, or the mapped
    /// transport/server error otherwise.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, secret: &str) -> Result<Identity, ClientError> {
        validate_login(username, secret)?;

        let body = LoginRequest {
            username: username.to_string(),
            secret: secret.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("/login")?)
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Login rejected");
            return Err(ClientError::InvalidCredentials);
        }

        let payload: LoginPayload = Self::json(response).await?;
        self.session.set_from_login_response(&payload);
        Ok(payload.user)
    }

    /// Sign out. Local session state is cleared whatever the server answers.
    ///
    /// # Errors
    /// Returns the transport or server error after clearing local state.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.send_logout().await;

        if let Err(err) = &result {
            warn!("Logout request failed, clearing local session anyway: {err}");
        }
        self.session.clear();
        result
    }

    async fn send_logout(&self) -> Result<(), ClientError> {
        let request = self.authorized(self.http.post(self.endpoint("/logout")?));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Fetch the guarded resource. A 401 clears the local session.
    ///
    /// # Errors
    /// Returns [`ClientError::Unauthorized`] when the server rejects the token.
    #[instrument(skip_all)]
    pub async fn protected(&self) -> Result<ProtectedResponse, ClientError> {
        let request = self.authorized(self.http.get(self.endpoint("/protected")?));
        match Self::json(request.send().await?).await {
            Err(err @ ClientError::Unauthorized(_)) => {
                debug!("Protected request rejected, clearing session");
                self.session.clear();
                Err(err)
            }
            other => other,
        }
    }

    /// # Errors
    /// Returns the transport or server error.
    pub async fn hello(&self) -> Result<HelloResponse, ClientError> {
        let request = self.authorized(self.http.get(self.endpoint("/hello")?));
        Self::json(request.send().await?).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, &body))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
    }
}
