/*
 * Responsibility
 * - Bearer token による認可ゲート一式 (extractor → verifier → enforcer)
 * - 外部 IdP の公開鍵セット (JWKS) のキャッシュ
 * - handler からは AuthorizationGate と DecodedClaims だけが見えればよい
 */
pub mod error;
pub mod extractor;
pub mod factory;
pub mod gate;
pub mod key_cache;
pub mod key_set;
pub mod permissions;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use error::AuthError;
pub use factory::build_authorization_gate;
pub use gate::AuthorizationGate;
pub use verifier::DecodedClaims;
