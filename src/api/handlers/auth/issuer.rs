//! Credential check and token minting for the login flow.
//!
//! Unknown usernames and wrong secrets both come back as
//! [`AuthError::InvalidCredentials`] so the response cannot be used to probe
//! which accounts exist.

use crate::token::{Identity, Token, TokenCodec};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info, instrument};

use super::{credentials::CredentialStore, error::AuthError};

/// Result of a successful login: one token, delivered on both channels.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: Token,
    pub identity: Identity,
}

pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
    ttl: Duration,
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        credentials: Arc<dyn CredentialStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            codec,
            credentials,
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check credentials and mint a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a wrong
    /// secret, [`AuthError::Store`] when the credential backend fails, and
    /// [`AuthError::Mint`] if the token cannot be encoded.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, secret: &str) -> Result<IssuedSession, AuthError> {
        let record = self
            .credentials
            .find_by_username(username)
            .await
            .map_err(AuthError::Store)?;

        let Some(record) = record else {
            debug!("login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.check_secret(&record, secret) {
            debug!("login rejected: secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity {
            id: record.id,
            username: record.username,
        };
        let token = self
            .codec
            .mint(&identity, self.ttl)
            .map_err(AuthError::Mint)?;

        info!(user_id = identity.id, "session issued");

        Ok(IssuedSession { token, identity })
    }
}
