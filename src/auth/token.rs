//! Token manager
//!
//! Exchanges a pre-authenticated identity token for a short-lived bearer
//! token at an edge function, caches it in memory, and refreshes it before
//! expiry. The manager is an explicitly constructed, injectable service:
//! the session layer owns one instance and passes it by reference to the
//! remote store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::store::StoreError;

/// Refresh this far ahead of expiry so in-flight requests never carry a
/// token that dies mid-call.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Fallback lifetime when the exchange response omits one.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 55 * 60;

/// A bearer token as returned by the exchange endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

/// The token-exchange call itself, abstracted so tests can fake the network.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn exchange(&self, identity_token: &str) -> Result<IssuedToken, StoreError>;
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

/// In-memory bearer token cache with proactive refresh.
///
/// Concurrent callers coalesce: the cache lock is held across the exchange,
/// so one refresh runs and everyone queued behind it reads the fresh token.
pub struct TokenManager {
    source: Arc<dyn TokenSource>,
    identity_token: String,
    cache: tokio::sync::Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(source: Arc<dyn TokenSource>, identity_token: impl Into<String>) -> Self {
        Self {
            source,
            identity_token: identity_token.into(),
            cache: tokio::sync::Mutex::new(None),
        }
    }

    /// Return a bearer token, refreshing if the cached one is missing or
    /// inside the refresh margin.
    pub async fn bearer_token(&self) -> Result<String, StoreError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Instant::now() + REFRESH_MARGIN < cached.expires_at {
                return Ok(cached.bearer.clone());
            }
        }

        debug!("refreshing bearer token");
        let issued = self.source.exchange(&self.identity_token).await?;
        let ttl = Duration::from_secs(issued.expires_in_secs.max(60));
        let bearer = issued.access_token;
        *cache = Some(CachedToken {
            bearer: bearer.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(bearer)
    }

    /// Drop the cached token. The next `bearer_token` call re-exchanges;
    /// the remote store calls this once after a 401/403 before retrying.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

/// Production token source: POSTs the identity token to an edge function
/// and reads back `{ "access_token": ..., "expires_in": ... }`.
#[derive(Clone)]
pub struct EdgeFunctionTokenSource {
    url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl EdgeFunctionTokenSource {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self {
            url: url.into(),
            api_key: api_key.into(),
            agent,
        }
    }

    fn exchange_blocking(&self, identity_token: &str) -> Result<IssuedToken, StoreError> {
        let resp = self
            .agent
            .post(&self.url)
            .set("apikey", &self.api_key)
            .set("Content-Type", "application/json")
            .send_json(serde_json::json!({ "token": identity_token }))
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    StoreError::Token(format!("exchange failed: HTTP {code}: {}", body.trim()))
                }
                other => StoreError::Token(other.to_string()),
            })?;

        let json: serde_json::Value = resp
            .into_json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let access_token = json
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StoreError::Malformed("exchange response missing access_token".into()))?
            .to_string();
        let expires_in_secs = json
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        Ok(IssuedToken {
            access_token,
            expires_in_secs,
        })
    }
}

#[async_trait]
impl TokenSource for EdgeFunctionTokenSource {
    async fn exchange(&self, identity_token: &str) -> Result<IssuedToken, StoreError> {
        let this = self.clone();
        let identity_token = identity_token.to_string();
        tokio::task::spawn_blocking(move || this.exchange_blocking(&identity_token))
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        exchanges: AtomicUsize,
        ttl_secs: u64,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn exchange(&self, _identity_token: &str) -> Result<IssuedToken, StoreError> {
            // Yield so concurrent callers genuinely overlap.
            tokio::time::sleep(Duration::from_millis(10)).await;
            let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                expires_in_secs: self.ttl_secs,
            })
        }
    }

    fn manager(ttl_secs: u64) -> (Arc<CountingSource>, TokenManager) {
        let source = Arc::new(CountingSource {
            exchanges: AtomicUsize::new(0),
            ttl_secs,
        });
        let mgr = TokenManager::new(source.clone(), "identity");
        (source, mgr)
    }

    #[tokio::test]
    async fn test_token_is_cached_while_fresh() {
        let (source, mgr) = manager(DEFAULT_TOKEN_TTL_SECS);
        let a = mgr.bearer_token().await.unwrap();
        let b = mgr.bearer_token().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(source.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce_into_one_exchange() {
        let (source, mgr) = manager(DEFAULT_TOKEN_TTL_SECS);
        let (a, b) = tokio::join!(mgr.bearer_token(), mgr.bearer_token());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshes_inside_expiry_margin() {
        // A one-minute lifetime is already inside the 5-minute refresh
        // margin, so every call re-exchanges.
        let (source, mgr) = manager(60);
        mgr.bearer_token().await.unwrap();
        mgr.bearer_token().await.unwrap();
        assert_eq!(source.exchanges.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (source, mgr) = manager(DEFAULT_TOKEN_TTL_SECS);
        let a = mgr.bearer_token().await.unwrap();
        mgr.invalidate().await;
        let b = mgr.bearer_token().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(source.exchanges.load(Ordering::SeqCst), 2);
    }
}
