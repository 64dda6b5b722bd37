//! OAuth2 refresh-token grant against the tado identity provider

use anyhow::Result;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{AuthUrl, ClientId, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};

use super::tokens::{now_millis, CredentialRecord, CredentialState, TokenStore};
use super::AuthConfig;
use crate::error::AuthError;

/// Safety margin subtracted from the token expiry before it counts as stale.
pub const EXPIRY_BUFFER_MS: i64 = 30_000;

/// Build the OAuth2 client from an AuthConfig
fn build_client(auth_config: &AuthConfig) -> Result<BasicClient> {
    let auth_url = AuthUrl::new(auth_config.authorize_url())?;
    let token_url = TokenUrl::new(auth_config.token_url())?;

    // No client secret: oauth2 sends client_id in the form body.
    Ok(BasicClient::new(
        ClientId::new(auth_config.client_id.clone()),
        None,
        auth_url,
        Some(token_url),
    ))
}

/// Owns the in-memory credential state and keeps the access token usable.
pub struct Authenticator {
    client: BasicClient,
    store: TokenStore,
    state: CredentialState,
}

impl Authenticator {
    /// Build an authenticator, seeding its state from the token file if present.
    pub fn new(auth_config: &AuthConfig, store: TokenStore) -> Result<Self> {
        let client = build_client(auth_config)?;
        let state = match store.load() {
            Some(record) => {
                tracing::info!("Loaded cached tokens from {}", store.path().display());
                CredentialState::from(record)
            }
            None => {
                tracing::warn!(
                    "No cached tokens at {}; seed the token file to start polling",
                    store.path().display()
                );
                CredentialState::default()
            }
        };

        Ok(Self {
            client,
            store,
            state,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.state.access_token.as_deref()
    }

    /// Make sure a usable access token is held, refreshing it when needed.
    pub async fn ensure_valid(&mut self) -> Result<(), AuthError> {
        if self.state.is_fresh(now_millis(), EXPIRY_BUFFER_MS) {
            return Ok(());
        }

        if self.state.refresh_token.is_some() {
            tracing::debug!("Access token missing or about to expire");
            return self.refresh().await;
        }

        Err(AuthError::NoCredentials)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// On failure both tokens are dropped from memory. The token file is left
    /// untouched so a restart retries with whatever was last persisted.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let refresh_token = self
            .state
            .refresh_token
            .clone()
            .ok_or(AuthError::NoCredentials)?;

        tracing::info!("Refreshing tado access token...");

        let token_response = match self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                self.state.clear();
                let message = describe_refresh_error(&e);
                tracing::error!("Token refresh failed, tokens cleared: {}", message);
                return Err(AuthError::RefreshFailed(message));
            }
        };

        let expires_in = token_response.expires_in().map_or(0, |d| d.as_secs());
        if expires_in == 0 {
            tracing::warn!("Token response carried no lifetime; will refresh next cycle");
        }

        // Providers that do not rotate refresh tokens omit the field.
        let refresh_token = token_response
            .refresh_token()
            .map_or(refresh_token, |rt| rt.secret().to_string());

        let record = CredentialRecord::issued_now(
            token_response.access_token().secret().to_string(),
            refresh_token,
            expires_in,
        );
        self.state = CredentialState::from(record.clone());

        if let Err(e) = self.store.save(&record) {
            tracing::warn!(
                "Refreshed tokens could not be written to {}: {}",
                self.store.path().display(),
                e
            );
        }

        tracing::info!("Token refresh complete (expires in {}s)", expires_in);
        Ok(())
    }
}

/// Prefer the provider's error body, fall back to the transport message.
fn describe_refresh_error<RE>(err: &RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(resp) => resp.to_string(),
        RequestTokenError::Parse(_, body) if !body.is_empty() => {
            String::from_utf8_lossy(body).into_owned()
        }
        RequestTokenError::Parse(e, _) => e.to_string(),
        RequestTokenError::Request(e) => e.to_string(),
        RequestTokenError::Other(msg) => msg.clone(),
    }
}

/// Display current token status
pub fn status(store: &TokenStore) {
    println!("Token file:  {}", store.path().display());

    let Some(record) = store.load() else {
        println!("Tokens:      none");
        println!("\nRun 'tado-poller seed' to store tokens.");
        return;
    };

    let expires_at = record.expires_at();
    let expiry = chrono::DateTime::from_timestamp_millis(expires_at)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| expires_at.to_string());

    let state = CredentialState::from(record);
    match state.access_token {
        Some(_) if state.is_fresh(now_millis(), EXPIRY_BUFFER_MS) => {
            println!("Access tok:  valid");
            println!("  expires_at: {}", expiry);
        }
        Some(_) => {
            println!("Access tok:  expired");
            println!("  expired_at: {}", expiry);
        }
        None => println!("Access tok:  none"),
    }

    match state.refresh_token {
        Some(_) => println!("Refresh tok: present"),
        None => println!("Refresh tok: none"),
    }
}
