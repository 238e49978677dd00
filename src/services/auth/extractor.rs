/*
 * Responsibility
 * - Authorization ヘッダから Bearer トークンを取り出す (検証はしない)
 */
use axum::http::{HeaderMap, header};

use crate::services::auth::error::AuthError;

/// Raw token from `Authorization: Bearer <token>`. Not parsed or trusted yet.
///
/// Debug is redacted so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

pub fn extract(headers: &HeaderMap) -> Result<BearerToken, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::AuthorizationHeaderMissing)?;

    let value = value.to_str().map_err(|_| AuthError::InvalidHeader)?;

    let mut parts = value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::InvalidHeader);
    };

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidHeader);
    }

    Ok(BearerToken(token.to_string()))
}
