//! RSA issuer fixtures shared by the auth unit tests.
use std::{
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::{RsaPrivateKey, pkcs1::EncodeRsaPrivateKey, traits::PublicKeyParts};
use serde_json::json;

use crate::services::auth::{
    key_cache::{KeySetCache, KeySetCacheConfig, KeySetError, KeySource, StaticKeySource},
    key_set::JwksDocument,
};

pub const ISSUER: &str = "https://casting.test.auth0.com/";
pub const AUDIENCE: &str = "casting-agency";

pub struct TestIssuer {
    kid: &'static str,
    key: RsaPrivateKey,
    encoding_key: EncodingKey,
}

static PRIMARY: OnceLock<TestIssuer> = OnceLock::new();
static ROTATED: OnceLock<TestIssuer> = OnceLock::new();

impl TestIssuer {
    pub fn primary() -> &'static TestIssuer {
        PRIMARY.get_or_init(|| Self::generate("key-a"))
    }

    pub fn rotated() -> &'static TestIssuer {
        ROTATED.get_or_init(|| Self::generate("key-b"))
    }

    fn generate(kid: &'static str) -> Self {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("rsa key");
        let pem = key.to_pkcs1_pem(Default::default()).expect("pem");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key");

        Self {
            kid,
            key,
            encoding_key,
        }
    }

    pub fn kid(&self) -> &'static str {
        self.kid
    }

    pub fn jwk(&self) -> serde_json::Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "alg": "RS256",
            "use": "sig",
            "n": URL_SAFE_NO_PAD.encode(self.key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(self.key.e().to_bytes_be()),
        })
    }

    pub fn jwks(&self) -> serde_json::Value {
        json!({ "keys": [self.jwk()] })
    }

    pub fn sign(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.to_string());
        self.sign_with_header(&header, claims)
    }

    pub fn sign_with_header(&self, header: &Header, claims: &serde_json::Value) -> String {
        jsonwebtoken::encode(header, claims, &self.encoding_key).expect("token")
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims as the identity provider issues them, expiring `exp_in` seconds from now.
pub fn claims(permissions: &[&str], exp_in: i64) -> serde_json::Value {
    let now = now();
    json!({
        "iss": ISSUER,
        "sub": "auth0|producer",
        "aud": [AUDIENCE, "https://casting.test.auth0.com/userinfo"],
        "iat": now,
        "exp": now + exp_in,
        "permissions": permissions,
    })
}

/// Cache over a fixed key document, refetchable at any time.
pub fn cache_for(issuers: &[&TestIssuer]) -> Arc<KeySetCache> {
    let keys: Vec<_> = issuers.iter().map(|i| i.jwk()).collect();
    let source = StaticKeySource::new(json!({ "keys": keys }));

    Arc::new(KeySetCache::new(
        Arc::new(source),
        KeySetCacheConfig {
            min_refresh_interval: Duration::ZERO,
            ..KeySetCacheConfig::default()
        },
    ))
}

/// Serves a swappable document (or an outage) and counts fetches.
pub struct CountingSource {
    document: Mutex<serde_json::Value>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
}

impl CountingSource {
    pub fn new(document: serde_json::Value) -> Arc<Self> {
        Self::with_delay(document, Duration::ZERO)
    }

    pub fn with_delay(document: serde_json::Value, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            document: Mutex::new(document),
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
        })
    }

    pub fn publish(&self, document: serde_json::Value) {
        *self.document.lock().unwrap() = document;
    }

    /// While set, every fetch answers like an issuer returning 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(KeySetError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        let document = self.document.lock().unwrap().clone();
        Ok(serde_json::from_value(document)?)
    }
}
