//! Auth state and configuration.

use crate::token::TokenCodec;
use std::{sync::Arc, time::Duration};

use super::{credentials::CredentialStore, issuer::SessionIssuer};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60;
pub(crate) const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:4200";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    /// Cookies are only marked `Secure` when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Shared, read-only auth wiring handed to handlers and the guard.
pub struct AuthState {
    config: AuthConfig,
    codec: Arc<TokenCodec>,
    issuer: SessionIssuer,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        codec: Arc<TokenCodec>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let issuer = SessionIssuer::new(codec.clone(), credentials, config.session_ttl());
        Self {
            config,
            codec,
            issuer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }
}

#[cfg(test)]
mod tests {
    use super::super::credentials::MemoryCredentialStore;
    use super::{AuthConfig, AuthState};
    use crate::token::TokenCodec;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::default();
        assert_eq!(config.frontend_base_url(), "http://localhost:4200");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert!(!config.session_cookie_secure());

        let config = AuthConfig::new("https://app.tokengate.dev".to_string())
            .with_session_ttl_seconds(120);
        assert_eq!(config.session_ttl(), Duration::from_secs(120));
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn auth_state_shares_codec_with_issuer() -> anyhow::Result<()> {
        let codec = Arc::new(TokenCodec::new(&SecretString::from("secret"))?);
        let state = AuthState::new(
            AuthConfig::default(),
            codec.clone(),
            Arc::new(MemoryCredentialStore::with_demo_user()),
        );
        assert_eq!(state.issuer().ttl(), Duration::from_secs(3600));
        assert_eq!(Arc::strong_count(&codec), 3);
        Ok(())
    }
}
