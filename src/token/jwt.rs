use super::error::{KeyError, TokenError};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{fmt, time::Duration};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

/// Authenticated principal carried inside a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct Identity {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub id: u64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Compact signed token string.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

// Token material stays out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Mints and verifies HS256 tokens with a process-wide signing key.
///
/// The key is fixed at construction; every other operation only reads it, so
/// a single codec can be shared behind an `Arc` by any number of tasks.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the shared signing secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty.
    pub fn new(secret: &SecretString) -> Result<Self, KeyError> {
        let key = secret.expose_secret().as_bytes();
        if key.is_empty() {
            return Err(KeyError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| KeyError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Mint a token for `identity` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if the header or claims fail to
    /// serialize.
    pub fn mint(&self, identity: &Identity, ttl: Duration) -> Result<Token, TokenError> {
        self.mint_at(identity, ttl, now_unix_seconds())
    }

    /// Mint a token with an explicit issue time (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::mint`].
    pub fn mint_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now_unix_seconds: i64,
    ) -> Result<Token, TokenError> {
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            id: identity.id,
            username: identity.username.clone(),
            iat: now_unix_seconds,
            exp: now_unix_seconds.saturating_add(ttl_seconds),
        };

        let header = TokenHeader {
            alg: ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        };

        let header_b64 = b64e_json(&header)?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = self.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

        Ok(Token(format!("{signing_input}.{signature_b64}")))
    }

    /// Verify a token against the current clock and return its identity.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the token does not parse or the
    /// signature does not match, and [`TokenError::Expired`] once the clock
    /// has reached `exp`.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, now_unix_seconds())
    }

    /// Verify a token against an explicit clock (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::verify`].
    pub fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<Identity, TokenError> {
        self.verify_claims_at(token, now_unix_seconds)
            .map(Identity::from)
    }

    /// Verify a token against the current clock and return the full claims.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::verify`].
    pub fn verify_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_claims_at(token, now_unix_seconds())
    }

    /// Verify a token and return the full claims, including its lifetime.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::verify`].
    pub fn verify_claims_at(
        &self,
        token: &str,
        now_unix_seconds: i64,
    ) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let sig_b64 = parts.next().ok_or(TokenError::Malformed)?;
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Malformed)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        // Exactly at `exp` the token is already dead.
        if now_unix_seconds >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Encoding)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

pub(crate) fn now_unix_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}
