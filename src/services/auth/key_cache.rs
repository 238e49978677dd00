//! Signing key cache for the token issuer.
//!
//! The cached `KeySet` is published through an `ArcSwapOption`, so readers on
//! the hot path never take a lock and never observe a half-built set. Refreshes
//! go through `refresh_lock`: when many requests miss on the same (new) kid at
//! once, the first one fetches and the rest re-check the freshly published set.
use std::{path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use url::Url;

use crate::services::auth::{
    error::AuthError,
    key_set::{JwksDocument, KeySet, SigningKey},
};

/// Failures while obtaining the issuer's key document.
///
/// These never reach the client; the cache collapses them into
/// `AuthError::KeySetUnavailable`.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("key set request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("key set endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
    #[error("key set document is malformed: {0}")]
    Document(#[from] serde_json::Error),
    #[error("key set file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("key set fetch timed out")]
    Timeout,
}

/// Where a key document comes from.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    // Location for logs (url or file path).
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<JwksDocument, KeySetError>;
}

/// Issuer-hosted JWKS endpoint (e.g. `https://<domain>/.well-known/jwks.json`).
#[derive(Clone, Debug)]
pub struct RemoteKeySource {
    client: reqwest::Client,
    url: Url,
}

impl RemoteKeySource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("casting-agency/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl KeySource for RemoteKeySource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
        let response = self.client.get(self.url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(KeySetError::Status {
                status: response.status(),
            });
        }

        // Read as bytes first so a bad body is reported as a document error.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Fixed key document held in memory (local JWKS file, or tests).
#[derive(Clone, Debug)]
pub struct StaticKeySource {
    document: serde_json::Value,
    origin: String,
}

impl StaticKeySource {
    pub fn new(document: serde_json::Value) -> Self {
        Self {
            document,
            origin: "inline".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, KeySetError> {
        let raw = std::fs::read(path)?;
        let document = serde_json::from_slice(&raw)?;

        Ok(Self {
            document,
            origin: path.display().to_string(),
        })
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    fn describe(&self) -> String {
        self.origin.clone()
    }

    async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
        Ok(serde_json::from_value(self.document.clone())?)
    }
}

#[derive(Debug, Clone)]
pub struct KeySetCacheConfig {
    /// The single algorithm tokens may be signed with.
    pub algorithm: Algorithm,
    /// Age after which the whole set is refetched. `None` keeps it until a kid miss.
    pub ttl: Option<Duration>,
    /// Minimum age of the cached set before an unknown kid may trigger a refetch.
    pub min_refresh_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for KeySetCacheConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RS256,
            ttl: Some(Duration::from_secs(600)),
            min_refresh_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

struct Snapshot {
    keys: KeySet,
    fetched_at: Instant,
}

pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    config: KeySetCacheConfig,
    current: ArcSwapOption<Snapshot>,
    // When the most recent fetch failed; replaced on every failure.
    last_failure: ArcSwapOption<Instant>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("source", &self.source.describe())
            .field("config", &self.config)
            .finish()
    }
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySource>, config: KeySetCacheConfig) -> Self {
        Self {
            source,
            config,
            current: ArcSwapOption::empty(),
            last_failure: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    /// Resolve the signing key for `kid`, refetching the set at most once.
    ///
    /// # Errors
    /// - `KeySetUnavailable` if a needed fetch fails or times out, if another
    ///   caller's fetch failed while this one waited, or within
    ///   `min_refresh_interval` of the last failed fetch.
    /// - `InvalidHeader` if the kid is still unknown after a fresh fetch (or the
    ///   set is too young to be refetched).
    pub async fn get_key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        let observed = self.current.load_full();
        let observed_failure = self.last_failure.load_full();
        if let Some(snapshot) = observed.as_deref()
            && self.is_fresh(snapshot)
            && let Some(key) = snapshot.keys.get(kid)
        {
            return Ok(key.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        let latest = self.current.load_full();
        if let Some(snapshot) = latest.as_deref()
            && self.is_fresh(snapshot)
        {
            if let Some(key) = snapshot.keys.get(kid) {
                return Ok(key.clone());
            }

            let published_while_waiting = !same_arc(&observed, &latest);
            let too_young = snapshot.fetched_at.elapsed() < self.config.min_refresh_interval;
            if published_while_waiting || too_young {
                tracing::warn!(kid = %kid, "token references an unknown signing key");
                return Err(AuthError::InvalidHeader);
            }
        }

        // Queued callers share the outcome of a failed fetch instead of each
        // waiting out another `fetch_timeout`.
        let failure = self.last_failure.load_full();
        if let Some(failed_at) = failure.as_deref() {
            let failed_while_waiting = !same_arc(&observed_failure, &failure);
            let backing_off = failed_at.elapsed() < self.config.min_refresh_interval;
            if failed_while_waiting || backing_off {
                return Err(AuthError::KeySetUnavailable);
            }
        }

        let snapshot = self.fetch_and_publish().await?;
        match snapshot.keys.get(kid) {
            Some(key) => Ok(key.clone()),
            None => {
                tracing::warn!(kid = %kid, "token references an unknown signing key");
                Err(AuthError::InvalidHeader)
            }
        }
    }

    /// Unconditionally refetch the key set (e.g. warm-up at startup).
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        let snapshot = self.fetch_and_publish().await?;
        Ok(snapshot.keys.len())
    }

    // Caller must hold `refresh_lock`.
    async fn fetch_and_publish(&self) -> Result<Arc<Snapshot>, AuthError> {
        let source = self.source.describe();

        let document = match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch())
            .await
            .unwrap_or(Err(KeySetError::Timeout))
        {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "signing key set fetch failed");
                self.last_failure.store(Some(Arc::new(Instant::now())));
                return Err(AuthError::KeySetUnavailable);
            }
        };

        let keys = KeySet::from_document(document, self.config.algorithm);
        tracing::info!(
            source = %source,
            kids = ?keys.kids().collect::<Vec<_>>(),
            "signing key set refreshed"
        );

        let snapshot = Arc::new(Snapshot {
            keys,
            fetched_at: Instant::now(),
        });
        self.current.store(Some(snapshot.clone()));

        Ok(snapshot)
    }

    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        match self.config.ttl {
            Some(ttl) => snapshot.fetched_at.elapsed() < ttl,
            None => true,
        }
    }
}

fn same_arc<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
