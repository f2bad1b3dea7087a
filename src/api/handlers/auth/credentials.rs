//! Credential lookup for the login flow.
//!
//! The store only answers "which record has this username" and "does this
//! secret match". Creating or updating records is out of scope for the
//! service; the Postgres backend reads a table provisioned elsewhere.

use anyhow::{Context, Result, anyhow};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgPool, Row};
use std::{collections::HashMap, fmt, future::Future, pin::Pin};
use tracing::Instrument;

/// Stored credentials for one user.
#[derive(Clone)]
pub struct CredentialRecord {
    pub id: u64,
    pub username: String,
    pub secret: SecretString,
}

impl CredentialRecord {
    #[must_use]
    pub fn new(id: u64, username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<CredentialRecord>>> + Send + 'a>>;

pub trait CredentialStore: Send + Sync {
    /// Find the record for `username`; `Ok(None)` when no such user exists.
    fn find_by_username<'a>(&'a self, username: &'a str) -> LookupFuture<'a>;

    /// Compare a supplied secret with the stored one.
    fn check_secret(&self, record: &CredentialRecord, supplied: &str) -> bool {
        check_secret(record, supplied)
    }
}

/// Plain-text comparison. Stored secrets must move to a salted hash verifier
/// before this holds real passwords.
#[must_use]
pub fn check_secret(record: &CredentialRecord, supplied: &str) -> bool {
    record.secret.expose_secret() == supplied
}

/// Read-only in-memory store, keyed by username.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.username.clone(), record))
                .collect(),
        }
    }

    /// Store seeded with the demo account used by the bundled client.
    #[must_use]
    pub fn with_demo_user() -> Self {
        Self::new([CredentialRecord::new(1, "miles@web.com", "e-1610")])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_username<'a>(&'a self, username: &'a str) -> LookupFuture<'a> {
        let record = self.records.get(username).cloned();
        Box::pin(async move { Ok(record) })
    }
}

/// Postgres-backed store reading `users(id, username, secret)`.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lookup(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let query = "SELECT id, username, secret FROM users WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credential record")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.try_get("id").context("missing id column")?;
        let id = u64::try_from(id).map_err(|_| anyhow!("negative user id: {id}"))?;
        let username: String = row.try_get("username").context("missing username column")?;
        let secret: String = row.try_get("secret").context("missing secret column")?;

        Ok(Some(CredentialRecord::new(id, username, secret)))
    }
}

impl CredentialStore for PgCredentialStore {
    fn find_by_username<'a>(&'a self, username: &'a str) -> LookupFuture<'a> {
        Box::pin(self.lookup(username))
    }
}
