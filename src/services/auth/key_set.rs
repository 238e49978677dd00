/*
 * Responsibility
 * - 発行者が公開する JWKS ドキュメント → 検証用の KeySet への変換
 * - 設定されたアルゴリズムで使えない鍵はここで落とす
 */
use jsonwebtoken::{
    Algorithm, DecodingKey,
    jwk::{AlgorithmParameters, Jwk, KeyAlgorithm, PublicKeyUse},
};
use serde::Deserialize;

/// Public key published by the issuer, bound to the one algorithm it may verify.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl SigningKey {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Raw JWKS document. Entries stay as JSON so one unknown key type does not
/// poison the whole set.
#[derive(Debug, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<serde_json::Value>,
}

/// Keys usable for the configured algorithm, in document order, unique by kid.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<SigningKey>,
}

impl KeySet {
    pub fn from_document(document: JwksDocument, algorithm: Algorithm) -> Self {
        let mut keys: Vec<SigningKey> = Vec::with_capacity(document.keys.len());

        for raw in document.keys {
            let jwk: Jwk = match serde_json::from_value(raw) {
                Ok(jwk) => jwk,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable jwk");
                    continue;
                }
            };

            let Some(key) = signing_key_from_jwk(&jwk, algorithm) else {
                continue;
            };

            // first occurrence wins
            if keys.iter().any(|k| k.kid == key.kid) {
                tracing::debug!(kid = %key.kid, "skipping duplicate kid");
                continue;
            }
            keys.push(key);
        }

        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.kid.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn signing_key_from_jwk(jwk: &Jwk, algorithm: Algorithm) -> Option<SigningKey> {
    let kid = jwk.common.key_id.as_deref().filter(|k| !k.is_empty())?;

    if let Some(key_use) = &jwk.common.public_key_use
        && *key_use != PublicKeyUse::Signature
    {
        return None;
    }

    // A declared alg must match exactly; an undeclared one is inferred from the key family.
    match jwk.common.key_algorithm {
        Some(declared) if algorithm_of(declared) != Some(algorithm) => return None,
        Some(_) => {}
        None if !family_matches(&jwk.algorithm, algorithm) => return None,
        None => {}
    }

    let decoding_key = match DecodingKey::from_jwk(jwk) {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!(kid = %kid, error = %err, "skipping jwk with invalid key material");
            return None;
        }
    };

    Some(SigningKey {
        kid: kid.to_string(),
        algorithm,
        decoding_key,
    })
}

fn algorithm_of(key_algorithm: KeyAlgorithm) -> Option<Algorithm> {
    match key_algorithm {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

fn family_matches(params: &AlgorithmParameters, algorithm: Algorithm) -> bool {
    match params {
        AlgorithmParameters::RSA(_) => matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(algorithm, Algorithm::ES256 | Algorithm::ES384)
        }
        AlgorithmParameters::OctetKeyPair(_) => matches!(algorithm, Algorithm::EdDSA),
        // Symmetric keys never verify an asymmetric algorithm.
        _ => false,
    }
}

/// Asymmetric algorithms the gate may be configured with.
pub fn is_asymmetric(algorithm: Algorithm) -> bool {
    !matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}
