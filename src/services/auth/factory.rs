/// Factory: build the `AuthorizationGate` from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::auth::{
    gate::AuthorizationGate,
    key_cache::{
        KeySetCache, KeySetCacheConfig, KeySetError, KeySource, RemoteKeySource, StaticKeySource,
    },
    permissions::PermissionEnforcer,
    verifier::{TokenVerifier, VerifierConfig},
};

pub async fn build_authorization_gate(
    config: &Config,
) -> Result<Arc<AuthorizationGate>, KeySetError> {
    let source: Arc<dyn KeySource> = match &config.jwks_path {
        Some(path) => Arc::new(StaticKeySource::from_file(path)?),
        None => Arc::new(RemoteKeySource::new(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
        )?),
    };

    let keys = Arc::new(KeySetCache::new(source, cache_config(config)));

    // Warm-up only: an unreachable issuer must not keep the API from starting.
    match keys.refresh().await {
        Ok(count) => tracing::info!(keys = count, "signing keys loaded"),
        Err(err) => tracing::warn!(
            category = err.code(),
            "signing keys not loaded at startup; will retry on first request"
        ),
    }

    let verifier = TokenVerifier::new(
        keys,
        VerifierConfig {
            issuer: config.auth_issuer.clone(),
            audience: config.auth_audience.clone(),
            leeway_seconds: config.access_token_leeway_seconds,
        },
    );

    Ok(Arc::new(AuthorizationGate::new(
        verifier,
        PermissionEnforcer::new(config.missing_permissions),
    )))
}

fn cache_config(config: &Config) -> KeySetCacheConfig {
    KeySetCacheConfig {
        algorithm: config.auth_algorithm,
        // 0 disables age-based refresh; unknown kids still trigger one.
        ttl: match config.jwks_cache_ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
        min_refresh_interval: Duration::from_secs(config.jwks_min_refresh_seconds),
        fetch_timeout: Duration::from_secs(config.jwks_fetch_timeout_seconds),
    }
}
