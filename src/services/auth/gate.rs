//! Authorization gate: the single decision every protected operation waits on.
//!
//! `authorize` walks
//! `HeaderExtracted → SignatureVerified → ClaimsValidated → PermissionChecked`
//! and stops at the first failure. Each call is independent; the only state
//! shared between calls is the key cache behind the verifier.
use axum::http::HeaderMap;

use crate::services::auth::{
    error::AuthError,
    extractor,
    permissions::PermissionEnforcer,
    verifier::{DecodedClaims, TokenVerifier},
};

/// Last state a request reached before it was rejected (for logs only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    HeaderExtracted,
    SignatureVerified,
    ClaimsValidated,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::HeaderExtracted => "header_extracted",
            Stage::SignatureVerified => "signature_verified",
            Stage::ClaimsValidated => "claims_validated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    verifier: TokenVerifier,
    enforcer: PermissionEnforcer,
}

impl AuthorizationGate {
    pub fn new(verifier: TokenVerifier, enforcer: PermissionEnforcer) -> Self {
        Self { verifier, enforcer }
    }

    /// Authorize a request for `required_permission` (`""` = any verified token).
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<DecodedClaims, AuthError> {
        let token = extractor::extract(headers).map_err(|e| reject(Stage::Start, e))?;

        // The verifier runs signature and claim checks back to back; claim
        // failures mean the signature was already accepted.
        let claims = self.verifier.verify(&token).await.map_err(|e| {
            let stage = match e {
                AuthError::TokenExpired | AuthError::InvalidClaims => Stage::SignatureVerified,
                _ => Stage::HeaderExtracted,
            };
            reject(stage, e)
        })?;

        let claims = self
            .enforcer
            .require(claims, required_permission)
            .map_err(|e| reject(Stage::ClaimsValidated, e))?;

        tracing::debug!(
            permission = %required_permission,
            subject = claims.subject().unwrap_or("-"),
            "request authorized"
        );
        Ok(claims)
    }
}

fn reject(stage: Stage, error: AuthError) -> AuthError {
    tracing::warn!(
        stage = stage.as_str(),
        category = error.code(),
        reason = %error,
        "request rejected by authorization gate"
    );
    error
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, header};
    use serde_json::json;

    use super::*;
    use crate::services::auth::{
        key_cache::{KeySetCache, KeySetCacheConfig},
        permissions::MissingPermissions,
        test_support::{AUDIENCE, CountingSource, ISSUER, TestIssuer, cache_for, claims},
        verifier::VerifierConfig,
    };

    fn verifier_config() -> VerifierConfig {
        VerifierConfig {
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
            leeway_seconds: 0,
        }
    }

    fn gate(cache: Arc<KeySetCache>) -> AuthorizationGate {
        AuthorizationGate::new(
            TokenVerifier::new(cache, verifier_config()),
            PermissionEnforcer::new(MissingPermissions::Reject),
        )
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_header_regardless_of_permission() {
        let gate = gate(cache_for(&[TestIssuer::primary()]));

        for permission in ["", "get:movies", "delete:actors"] {
            assert_eq!(
                gate.authorize(&HeaderMap::new(), permission)
                    .await
                    .unwrap_err(),
                AuthError::AuthorizationHeaderMissing
            );
        }
    }

    #[tokio::test]
    async fn grants_held_permission_and_denies_others() {
        let a = TestIssuer::primary();
        let gate = gate(cache_for(&[a]));
        let headers = bearer(&a.sign(&claims(&["get:movies"], 3600)));

        let decoded = gate.authorize(&headers, "get:movies").await.unwrap();
        assert_eq!(
            decoded.permissions().unwrap().iter().collect::<Vec<_>>(),
            vec!["get:movies"]
        );

        assert_eq!(
            gate.authorize(&headers, "delete:movies").await.unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[tokio::test]
    async fn repeated_calls_are_equivalent() {
        let a = TestIssuer::primary();
        let gate = gate(cache_for(&[a]));
        let headers = bearer(&a.sign(&claims(&["get:actors"], 3600)));

        let first = gate.authorize(&headers, "get:actors").await.unwrap();
        let second = gate.authorize(&headers, "get:actors").await.unwrap();
        assert_eq!(first, second);

        let denied = gate.authorize(&headers, "post:actors").await.unwrap_err();
        let denied_again = gate.authorize(&headers, "post:actors").await.unwrap_err();
        assert_eq!(denied, denied_again);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_permission_check() {
        let a = TestIssuer::primary();
        let gate = gate(cache_for(&[a]));
        let headers = bearer(&a.sign(&claims(&["get:movies"], -1)));

        assert_eq!(
            gate.authorize(&headers, "get:movies").await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn token_without_permissions_attribute() {
        let a = TestIssuer::primary();
        let gate = gate(cache_for(&[a]));
        let mut no_permissions = claims(&[], 3600);
        no_permissions.as_object_mut().unwrap().remove("permissions");
        let headers = bearer(&a.sign(&no_permissions));

        assert_eq!(
            gate.authorize(&headers, "get:movies").await.unwrap_err(),
            AuthError::InvalidClaims
        );
        // authentication-only routes still pass
        assert!(gate.authorize(&headers, "").await.is_ok());
    }

    #[tokio::test]
    async fn key_rotation_is_picked_up_with_one_refresh() {
        let a = TestIssuer::primary();
        let b = TestIssuer::rotated();
        let source = CountingSource::new(a.jwks());
        let cache = Arc::new(KeySetCache::new(
            source.clone(),
            KeySetCacheConfig {
                min_refresh_interval: std::time::Duration::ZERO,
                ..KeySetCacheConfig::default()
            },
        ));
        let gate = gate(cache);

        let old = bearer(&a.sign(&claims(&["get:movies"], 3600)));
        gate.authorize(&old, "get:movies").await.unwrap();

        source.publish(json!({ "keys": [a.jwk(), b.jwk()] }));
        let new = bearer(&b.sign(&claims(&["get:movies"], 3600)));
        gate.authorize(&new, "get:movies").await.unwrap();
        gate.authorize(&new, "get:movies").await.unwrap();

        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_with_uncached_key() {
        let a = TestIssuer::primary();
        let source = CountingSource::with_delay(a.jwks(), std::time::Duration::from_millis(50));
        let cache = Arc::new(KeySetCache::new(
            source.clone(),
            KeySetCacheConfig {
                min_refresh_interval: std::time::Duration::ZERO,
                ..KeySetCacheConfig::default()
            },
        ));
        let gate = Arc::new(gate(cache));

        let granted = bearer(&a.sign(&claims(&["get:movies"], 3600)));
        let denied = bearer(&a.sign(&claims(&["get:actors"], 3600)));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let gate = gate.clone();
            let headers = if i % 2 == 0 {
                granted.clone()
            } else {
                denied.clone()
            };
            tasks.push(tokio::spawn(async move {
                (i, gate.authorize(&headers, "get:movies").await)
            }));
        }

        for task in tasks {
            let (i, result) = task.await.unwrap();
            if i % 2 == 0 {
                assert!(result.is_ok());
            } else {
                assert_eq!(result.unwrap_err(), AuthError::Unauthorized);
            }
        }
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Start.as_str(), "start");
        assert_eq!(Stage::ClaimsValidated.as_str(), "claims_validated");
    }
}
