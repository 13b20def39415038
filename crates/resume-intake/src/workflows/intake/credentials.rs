use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::config::CredentialConfig;

/// Bearer material presented to the storage backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.ensure_valid(now).is_ok()
    }

    /// Returns the raw token when it is non-empty and not yet expired.
    pub fn ensure_valid(&self, now: DateTime<Utc>) -> Result<&str, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::Missing);
        }
        match self.expires_at {
            Some(expires_at) if now >= expires_at => Err(CredentialError::Expired(expires_at)),
            _ => Ok(&self.token),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("no storage credential is available; complete the consent flow first")]
    Missing,
    #[error("storage credential expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("credential source unavailable: {0}")]
    Unavailable(String),
}

/// Capability handing out credentials to the intake service.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn acquire(&self) -> Result<Credential, CredentialError>;
}

/// Mints a fresh credential, e.g. by exchanging a refresh token.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> Result<Credential, CredentialError>;
}

/// Hands out a single pre-provisioned credential until it expires.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    credential: Option<Credential>,
}

impl StaticCredentialSource {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }

    pub fn from_config(config: &CredentialConfig) -> Self {
        let credential = config.access_token.as_ref().map(|token| {
            let credential = Credential::bearer(token.clone());
            match config.expires_at {
                Some(expires_at) => credential.with_expiry(expires_at),
                None => credential,
            }
        });
        Self::new(credential)
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        let credential = self.credential.clone().ok_or(CredentialError::Missing)?;
        credential.ensure_valid(Utc::now())?;
        Ok(credential)
    }
}

/// Caches an issued credential and re-issues once it is within `skew` of expiry.
pub struct RefreshingCredentialSource<I> {
    issuer: I,
    skew: Duration,
    cached: Mutex<Option<Credential>>,
}

impl<I> RefreshingCredentialSource<I>
where
    I: CredentialIssuer,
{
    pub fn new(issuer: I, skew: Duration) -> Self {
        Self {
            issuer,
            skew,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<I> CredentialSource for RefreshingCredentialSource<I>
where
    I: CredentialIssuer,
{
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(credential) = cached.as_ref() {
            if credential.is_valid_at(now + self.skew) {
                return Ok(credential.clone());
            }
        }

        tracing::debug!("refreshing storage credential");
        let fresh = self.issuer.issue().await?;
        fresh.ensure_valid(now)?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}
