//! Authentication module for the tado° cloud API
//!
//! Keeps an OAuth2 access token valid by exchanging the cached refresh token
//! at the tado identity provider. The initial login is not performed here:
//! the token file has to be seeded by hand (see the `seed` command).

pub mod oauth;
pub mod tokens;

pub use oauth::{status, Authenticator};
pub use tokens::{CredentialRecord, TokenStore};

/// Default tado identity provider.
pub const DEFAULT_AUTH_BASE: &str = "https://login.tado.com";

/// Public client id used by tado's own apps for the refresh-token grant.
pub const DEFAULT_CLIENT_ID: &str = "1bb50063-6b0c-4d11-bd99-387f4a91cc46";

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth2 client ID (public client, no secret)
    pub client_id: String,
    /// Identity provider base URL, without trailing slash
    pub base_url: String,
}

impl AuthConfig {
    pub fn new(client_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base_url)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/authorize", self.base_url)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_ID, DEFAULT_AUTH_BASE)
    }
}
