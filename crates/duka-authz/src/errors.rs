use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("signing key unavailable")]
    MissingSigningKey,
    #[error("signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token ttl of {0}s does not fit an expiry timestamp")]
    TtlOutOfRange(u64),
    #[error("token expired")]
    Expired,
    #[error("unknown role claim: {0}")]
    UnknownRole(String),
}

impl AuthzError {
    /// True for failures caused by the presented token rather than by local
    /// key configuration.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthzError::Jwt(_) | AuthzError::Expired | AuthzError::UnknownRole(_)
        )
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            AuthzError::MissingSigningKey,
            AuthzError::Signing(jsonwebtoken::errors::Error::from(ErrorKind::InvalidKeyFormat)),
            AuthzError::Jwt(jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken)),
            AuthzError::TtlOutOfRange(u64::MAX),
            AuthzError::Expired,
            AuthzError::UnknownRole("root".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn key_errors_are_not_token_rejections() {
        assert!(!AuthzError::MissingSigningKey.is_token_rejection());
        assert!(!AuthzError::TtlOutOfRange(u64::MAX).is_token_rejection());
        assert!(AuthzError::Expired.is_token_rejection());
    }
}
