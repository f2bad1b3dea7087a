use crate::{
    api::{
        self,
        handlers::auth::{
            AuthConfig, AuthState, CredentialStore, MemoryCredentialStore, PgCredentialStore,
        },
    },
    cli::telemetry,
    token::TokenCodec,
};
use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub signing_secret: Option<SecretString>,
    pub token_ttl_seconds: u64,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing key is unusable, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let signing_secret = args.signing_secret.unwrap_or_else(|| {
        warn!("No signing secret configured; generated a random one, tokens will not survive a restart");
        generate_signing_secret()
    });
    let codec = Arc::new(TokenCodec::new(&signing_secret).context("Invalid signing secret")?);

    let credentials = credential_store(args.dsn.as_deref()).await?;

    let config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.token_ttl_seconds);
    let auth_state = Arc::new(AuthState::new(config, codec, credentials));

    let result = api::new(args.port, auth_state).await;

    telemetry::shutdown_tracer();

    result
}

async fn credential_store(dsn: Option<&str>) -> Result<Arc<dyn CredentialStore>> {
    let Some(dsn) = dsn else {
        warn!("No DSN configured; serving the built-in demo account only");
        return Ok(Arc::new(MemoryCredentialStore::with_demo_user()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to credential database");

    Ok(Arc::new(PgCredentialStore::new(pool)))
}

fn generate_signing_secret() -> SecretString {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretString::from(Base64UrlUnpadded::encode_string(&bytes))
}

fn log_startup_args(args: &Args) {
    debug!(
        port = args.port,
        database = args.dsn.is_some(),
        signing_secret = args.signing_secret.is_some(),
        token_ttl_seconds = args.token_ttl_seconds,
        frontend_base_url = %args.frontend_base_url,
        "Startup arguments"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn generated_secrets_are_random_and_usable() -> Result<()> {
        let first = generate_signing_secret();
        let second = generate_signing_secret();
        assert_eq!(first.expose_secret().len(), 43);
        assert_ne!(first.expose_secret(), second.expose_secret());
        assert!(TokenCodec::new(&first).is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_without_dsn() -> Result<()> {
        let store = credential_store(None).await?;
        let record = store.find_by_username("miles@web.com").await?;
        assert_eq!(record.map(|record| record.id), Some(1));
        Ok(())
    }
}
