/*
 * Responsibility
 *  - Authorized<P>: handler の第一引数として認可ゲートを通す extractor
 *  - P (権限タグ) が要求する permission を AuthorizationGate に渡す
 *  - 失敗は AppError::Auth として 401/403/503 に変換される
 * 置かないもの
 *  - 具体的な権限タグ (types.rs 側)
 */
use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, services::auth::DecodedClaims, state::AppState};

/// A permission an endpoint demands.
pub trait Permission: Send + Sync + 'static {
    /// Exact string looked up in the token's `permissions` claim.
    const NAME: &'static str;
}

/// Verified claims of a caller holding permission `P`.
pub struct Authorized<P> {
    pub claims: DecodedClaims,
    _permission: PhantomData<P>,
}

impl<P: Permission> Authorized<P> {
    /// Subject for audit logs.
    pub fn subject(&self) -> &str {
        self.claims.subject().unwrap_or("-")
    }
}

impl<P> FromRequestParts<AppState> for Authorized<P>
where
    P: Permission,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = state.gate.authorize(&parts.headers, P::NAME).await?;

        Ok(Self {
            claims,
            _permission: PhantomData,
        })
    }
}

impl<P: Permission> std::fmt::Debug for Authorized<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorized")
            .field("permission", &P::NAME)
            .field("subject", &self.claims.subject())
            .finish()
    }
}
