//! API client module for the tado° cloud

pub mod client;
mod homes;

use anyhow::Result;

use crate::auth::{AuthConfig, Authenticator, TokenStore};
use crate::error::{AuthError, FetchError};
use crate::models::Snapshot;
use client::TadoClient;

pub use homes::fetch_snapshot_data;

/// Runs fetch cycles: authenticate, then walk the resource hierarchy.
///
/// Owns the authenticator, and with it the only copy of the credential state.
pub struct Fetcher {
    auth: Authenticator,
    client: TadoClient,
}

impl Fetcher {
    pub fn new(auth: Authenticator, client: TadoClient) -> Self {
        Self { auth, client }
    }

    /// Build a fetcher from endpoint settings and a token file.
    pub fn from_parts(auth_config: &AuthConfig, api_base: &str, store: TokenStore) -> Result<Self> {
        let auth = Authenticator::new(auth_config, store)?;
        Ok(Self::new(auth, TadoClient::new(api_base)))
    }

    #[cfg(test)]
    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// One complete fetch cycle.
    pub async fn fetch_snapshot(&mut self) -> Result<Snapshot, FetchError> {
        self.auth.ensure_valid().await?;
        let token = self
            .auth
            .access_token()
            .ok_or(FetchError::Unauthenticated(AuthError::NoCredentials))?;

        fetch_snapshot_data(&self.client, token).await
    }
}

/// Run a single fetch cycle and print the snapshot.
pub async fn fetch_once(mut fetcher: Fetcher) -> Result<()> {
    let snapshot = fetcher.fetch_snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialRecord;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_without_tokens_is_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        let mut fetcher =
            Fetcher::from_parts(&AuthConfig::new("c", server.uri()), &server.uri(), store)
                .unwrap();

        let err = fetcher.fetch_snapshot().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Unauthenticated(AuthError::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn test_fetch_uses_refreshed_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "token_type": "bearer",
                "refresh_token": "r2",
                "expires_in": 599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"homes": []})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store
            .save(&CredentialRecord::issued_now("stale".into(), "r1".into(), 0))
            .unwrap();

        let mut fetcher =
            Fetcher::from_parts(&AuthConfig::new("c", server.uri()), &server.uri(), store)
                .unwrap();

        let snapshot = fetcher.fetch_snapshot().await.unwrap();
        assert!(snapshot.tado_homes.is_empty());
        assert_eq!(fetcher.authenticator().access_token(), Some("fresh"));
    }
}
