//! Access token verification.
//!
//! `verify` runs four steps in order and stops at the first failure:
//! structural parse, algorithm pin, signature check, claim validation.
//! Signature and claim checks are kept apart so each can be exercised alone;
//! `DecodedClaims` can only come out of `validate_claims`.
use std::{collections::BTreeSet, sync::Arc};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::Deserialize;

use crate::services::auth::{
    error::AuthError, extractor::BearerToken, key_cache::KeySetCache, key_set::SigningKey,
};

/// Claims of a token whose signature and mandatory claims were verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClaims {
    issuer: String,
    audience: Vec<String>,
    subject: Option<String>,
    expires_at: i64,
    issued_at: Option<i64>,
    permissions: Option<BTreeSet<String>>,
}

impl DecodedClaims {
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// `exp` as unix seconds.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    /// `None` when the token carries no `permissions` attribute at all.
    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.permissions.as_ref()
    }
}

// `aud` may be a single string or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(aud) => aud,
        }
    }
}

/// Token payload before any claim has been checked. Never leaves this module.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    permissions: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub issuer: String,
    pub audience: String,
    /// Seconds of clock skew tolerated on `exp`.
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    config: VerifierConfig,
    signature_only: Validation,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeySetCache>, config: VerifierConfig) -> Self {
        // jsonwebtoken only checks the signature here; claims are validated by us.
        let mut signature_only = Validation::new(keys.algorithm());
        signature_only.validate_exp = false;
        signature_only.validate_nbf = false;
        signature_only.validate_aud = false;
        signature_only.required_spec_claims.clear();

        Self {
            keys,
            config,
            signature_only,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.keys.algorithm()
    }

    pub async fn verify(&self, token: &BearerToken) -> Result<DecodedClaims, AuthError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    pub(crate) async fn verify_at(
        &self,
        token: &BearerToken,
        now: i64,
    ) -> Result<DecodedClaims, AuthError> {
        let header = parse_unverified(token.as_str())?;

        if header.alg != self.algorithm() {
            tracing::warn!(alg = ?header.alg, "token signed with a disallowed algorithm");
            return Err(AuthError::InvalidHeader);
        }

        let kid = header.kid.as_deref().ok_or(AuthError::InvalidHeader)?;
        let key = self.keys.get_key(kid).await?;

        if key.algorithm() != header.alg {
            return Err(AuthError::InvalidHeader);
        }

        let payload = verify_signature(token.as_str(), &key, &self.signature_only)?;
        validate_claims(payload, &self.config, now)
    }
}

/// Structural check before any key is looked up: three segments, a decodable
/// header and a JSON object payload.
fn parse_unverified(token: &str) -> Result<Header, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(AuthError::InvalidHeader);
    };

    // Unknown algorithms (including "none") fail here.
    let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::InvalidHeader)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidHeader)?;
    let payload: serde_json::Value =
        serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidHeader)?;
    if !payload.is_object() {
        return Err(AuthError::InvalidHeader);
    }

    Ok(header)
}

/// Returns the payload as untyped JSON; claim types are checked afterwards.
fn verify_signature(
    token: &str,
    key: &SigningKey,
    validation: &Validation,
) -> Result<serde_json::Value, AuthError> {
    let data = jsonwebtoken::decode::<serde_json::Value>(token, key.decoding_key(), validation)?;
    Ok(data.claims)
}

fn validate_claims(
    payload: serde_json::Value,
    config: &VerifierConfig,
    now: i64,
) -> Result<DecodedClaims, AuthError> {
    // A signed payload with a mistyped claim (`"exp": "tomorrow"`) is a claims problem.
    let raw: RawClaims = serde_json::from_value(payload).map_err(|_| AuthError::InvalidClaims)?;

    let exp = raw.exp.ok_or(AuthError::InvalidClaims)?;
    let leeway = i64::try_from(config.leeway_seconds).unwrap_or(i64::MAX);
    if exp.saturating_add(leeway) <= now {
        return Err(AuthError::TokenExpired);
    }

    let audience = raw.aud.map(Audience::into_vec).unwrap_or_default();
    if !audience.iter().any(|aud| aud == &config.audience) {
        return Err(AuthError::InvalidClaims);
    }

    let issuer = raw.iss.ok_or(AuthError::InvalidClaims)?;
    if issuer != config.issuer {
        return Err(AuthError::InvalidClaims);
    }

    let permissions = match raw.permissions {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(values)) => Some(
            values
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => Ok(s),
                    _ => Err(AuthError::InvalidClaims),
                })
                .collect::<Result<BTreeSet<_>, _>>()?,
        ),
        Some(_) => return Err(AuthError::InvalidClaims),
    };

    Ok(DecodedClaims {
        issuer,
        audience,
        subject: raw.sub,
        expires_at: exp,
        issued_at: raw.iat,
        permissions,
    })
}

#[cfg(test)]
impl DecodedClaims {
    /// Claims as if verified, for tests of code downstream of the verifier.
    pub(crate) fn verified_for_tests(permissions: Option<&[&str]>) -> Self {
        Self {
            issuer: "https://issuer.test/".to_string(),
            audience: vec!["audience".to_string()],
            subject: Some("auth0|tester".to_string()),
            expires_at: i64::MAX,
            issued_at: None,
            permissions: permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
        }
    }
}
