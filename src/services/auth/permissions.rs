/*
 * Responsibility
 * - 検証済み claims の permissions に、エンドポイントが要求する権限が含まれるか判定する
 * - permissions 属性そのものが無い場合の扱いは設定 (MissingPermissions) で切り替える
 */
use std::str::FromStr;

use crate::services::auth::{error::AuthError, verifier::DecodedClaims};

/// What an absent `permissions` attribute means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPermissions {
    /// Token shape is wrong for this issuer: `INVALID_CLAIMS`.
    #[default]
    Reject,
    /// Same as an empty list: `UNAUTHORIZED` for any concrete permission.
    TreatAsEmpty,
}

impl FromStr for MissingPermissions {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "treat-as-empty" | "empty" => Ok(Self::TreatAsEmpty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEnforcer {
    missing: MissingPermissions,
}

impl PermissionEnforcer {
    pub fn new(missing: MissingPermissions) -> Self {
        Self { missing }
    }

    /// Pass the claims through if they grant `required`.
    ///
    /// An empty `required` only demands a verified token.
    pub fn require(
        &self,
        claims: DecodedClaims,
        required: &str,
    ) -> Result<DecodedClaims, AuthError> {
        if required.is_empty() {
            return Ok(claims);
        }

        let granted = match (claims.permissions(), self.missing) {
            (Some(permissions), _) => permissions.contains(required),
            (None, MissingPermissions::Reject) => return Err(AuthError::InvalidClaims),
            (None, MissingPermissions::TreatAsEmpty) => false,
        };

        if granted {
            Ok(claims)
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}
