//! Authenticated HTTP client for the tado resource API
//!
//! Wraps reqwest::Client with bearer auth and status checking. Token
//! freshness is handled one level up by the Authenticator.

use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Default tado resource API base.
pub const DEFAULT_API_BASE: &str = "https://my.tado.com/api/v2";

pub struct TadoClient {
    http: reqwest::Client,
    base_url: String,
}

impl TadoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with bearer auth and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("tado GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FetchError::transport(&url, e.to_string()))?;

        let resp = check_response(resp, &url).await?;
        resp.json()
            .await
            .map_err(|e| FetchError::transport(&url, format!("invalid JSON body: {}", e)))
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(FetchError::transport(
            url,
            "401 Unauthorized; access token rejected",
        ));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::transport(
            url,
            format!("HTTP {}: {}", status.as_u16(), body),
        ));
    }
    Ok(resp)
}
