/*
 * Responsibility
 * - 認可ゲートが返す失敗カテゴリの定義
 * - カテゴリ → HTTP status / 固定 reason code の対応
 * - トークンの中身や検証ライブラリの詳細はここを越えて外に出さない
 */
use axum::http::StatusCode;
use thiserror::Error;

/// Categorized authorization failure.
///
/// Every variant is terminal for the request. `Display` yields a short static
/// message that is safe to log; `code()` is what crosses the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header is expected")]
    AuthorizationHeaderMissing,
    #[error("authorization header or token is malformed")]
    InvalidHeader,
    #[error("token signature could not be verified")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("incorrect claims, check the audience and issuer")]
    InvalidClaims,
    #[error("permission not granted")]
    Unauthorized,
    #[error("signing key set is unavailable")]
    KeySetUnavailable,
}

impl AuthError {
    /// Machine-safe reason code used as the response `message`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthorizationHeaderMissing => "AUTHORIZATION_HEADER_MISSING",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidClaims => "INVALID_CLAIMS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::KeySetUnavailable => "KEY_SET_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::KeySetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Maps `jsonwebtoken` failures raised during signature verification.
///
/// Structural problems (bad base64, bad JSON, algorithm or key-family mismatch)
/// are header-level; everything else is a signature failure.
impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::MissingAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::InvalidHeader,
            _ => Self::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_only_for_missing_permission() {
        let all = [
            AuthError::AuthorizationHeaderMissing,
            AuthError::InvalidHeader,
            AuthError::InvalidToken,
            AuthError::TokenExpired,
            AuthError::InvalidClaims,
        ];
        for e in all {
            assert_eq!(e.status(), StatusCode::UNAUTHORIZED, "{}", e.code());
        }
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::KeySetUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn signature_mismatch_maps_to_invalid_token() {
        let e: AuthError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert_eq!(e, AuthError::InvalidToken);
    }

    #[test]
    fn malformed_token_maps_to_invalid_header() {
        let e: AuthError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken).into();
        assert_eq!(e, AuthError::InvalidHeader);
    }
}
