use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error};
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::errors::{IngestError, IngestResult};

// Tokens within this many seconds of expiry are treated as already expired,
// absorbing clock skew and in-flight request latency.
const EXPIRY_BUFFER_SECONDS: i64 = 60;

/// An access token minted for one impersonated user, with its expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// Trait seam over the credential refresh so the cache can be tested without
// touching Google's token endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DelegatedTokenSource: Send + Sync {
    async fn fetch_token(&self, user: &str) -> IngestResult<CachedToken>;
}

/// Long-lived service-account identity with domain-wide delegation.
///
/// Holds the parsed key and the requested scope; per-user delegated
/// credentials are derived from it on every refresh and never stored.
pub struct CredentialStore {
    key: ServiceAccountKey,
    scope: String,
}

impl CredentialStore {
    pub async fn from_file(path: &str, scope: &str) -> IngestResult<Self> {
        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| {
                IngestError::Config(format!("failed to read service account key {path}: {e}"))
            })?;
        Ok(Self {
            key,
            scope: scope.to_string(),
        })
    }
}

#[async_trait]
impl DelegatedTokenSource for CredentialStore {
    // Derives a delegated credential for `user` and exchanges it for an
    // access token. Caching happens one level up in TokenCache.
    async fn fetch_token(&self, user: &str) -> IngestResult<CachedToken> {
        let auth = ServiceAccountAuthenticator::builder(self.key.clone())
            .subject(user)
            .build()
            .await
            .map_err(|e| IngestError::Auth {
                user: user.to_string(),
                reason: e.to_string(),
            })?;

        let token = auth
            .token(&[self.scope.as_str()])
            .await
            .map_err(|e| IngestError::Auth {
                user: user.to_string(),
                reason: e.to_string(),
            })?;

        let access_token = token.token().ok_or_else(|| IngestError::Auth {
            user: user.to_string(),
            reason: "token response carried no access token".to_string(),
        })?;

        // yup-oauth2 reports expiry as a time::OffsetDateTime; convert via
        // unix timestamp. A token without an expiry counts as already stale
        // so the next call refreshes again.
        let expires_at = token
            .expiration_time()
            .and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), 0))
            .unwrap_or_else(Utc::now);

        Ok(CachedToken {
            token: access_token.to_string(),
            expires_at,
        })
    }
}

type UserSlot = Arc<Mutex<Option<CachedToken>>>;

/// Per-user access-token cache over a [`DelegatedTokenSource`].
///
/// Holds at most one token per impersonated user. A token is served from
/// cache while its expiry is more than 60 seconds away; otherwise a refresh
/// replaces the entry.
pub struct TokenCache<S> {
    source: S,
    slots: Mutex<HashMap<String, UserSlot>>,
}

impl<S: DelegatedTokenSource> TokenCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    // Returns a valid access token for `user`, refreshing if the cached one
    // is missing or expires within the buffer window. The per-user slot lock
    // is held across check-refresh-store, so concurrent callers for the same
    // user collapse into a single refresh while other users proceed
    // independently.
    pub async fn ensure_token(&self, user: &str) -> IngestResult<String> {
        let slot = self.user_slot(user).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.expires_at > Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECONDS) {
                return Ok(cached.token.clone());
            }
        }

        debug!("refreshing access token for {}", user);
        let fresh = match self.source.fetch_token(user).await {
            Ok(token) => token,
            Err(e) => {
                // Nothing is cached on failure
                error!("token refresh failed for {}: {}", user, e);
                return Err(e);
            }
        };

        let token = fresh.token.clone();
        *entry = Some(fresh);
        Ok(token)
    }

    /// Drop every cached token. Used on client teardown.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    async fn user_slot(&self, user: &str) -> UserSlot {
        let mut slots = self.slots.lock().await;
        slots.entry(user.to_string()).or_default().clone()
    }
}
