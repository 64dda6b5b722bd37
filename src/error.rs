//! Error taxonomy for the polling pipeline
//!
//! Every error here is caught at the boundary of the operation that raised
//! it and turned into a log line; none of them terminate the poller.

use thiserror::Error;

/// Token file read/write failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while obtaining a usable access token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No access token and no refresh token. Fatal until the token file is reseeded.
    #[error("no tado credentials available; seed the token file first")]
    NoCredentials,

    /// The identity provider rejected the refresh, or it could not be reached.
    /// Tokens have been cleared.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Failures during one fetch cycle. Any of them aborts the whole cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not authenticated: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    pub fn transport(url: &str, message: impl Into<String>) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_converts_to_unauthenticated() {
        let err: FetchError = AuthError::NoCredentials.into();
        assert!(matches!(
            err,
            FetchError::Unauthenticated(AuthError::NoCredentials)
        ));
    }

    #[test]
    fn test_transport_display() {
        let err = FetchError::transport("https://my.tado.com/api/v2/me", "HTTP 500: boom");
        assert_eq!(
            err.to_string(),
            "request to https://my.tado.com/api/v2/me failed: HTTP 500: boom"
        );
    }

    #[test]
    fn test_refresh_failed_display() {
        let err = AuthError::RefreshFailed("invalid_grant".to_string());
        assert_eq!(err.to_string(), "token refresh failed: invalid_grant");
    }
}
