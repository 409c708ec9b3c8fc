//! Token endpoint and authenticated requests.

use super::constants::TOKEN_PATH;
use super::{NepseClient, RetryConfig, Transport};
use crate::auth::{TokenResponse, TokenSource, apply_auth};
use crate::core::{NepseError, net};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

impl Transport {
    async fn prove(&self) -> Result<TokenResponse, NepseError> {
        let url = self.url_for(TOKEN_PATH)?;
        let resp = self.send_with_retry(self.get(url.clone()), None).await?;

        if resp.status() != StatusCode::OK {
            return Err(NepseError::from_status(resp.status().as_u16(), url.as_str()));
        }

        let text = net::get_text(resp, "authenticate_prove").await?;
        serde_json::from_str(&text).map_err(|e| NepseError::Data(format!("token json parse: {e}")))
    }
}

impl TokenSource for Transport {
    fn fetch_raw_token<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<TokenResponse, NepseError>> + Send + 'a>> {
        Box::pin(self.prove())
    }
}

impl NepseClient {
    /// Call the token endpoint directly, without decoding or caching.
    pub async fn raw_token(&self) -> Result<TokenResponse, NepseError> {
        self.transport.prove().await
    }

    /// Current access token, acquiring one if needed.
    pub async fn access_token(&self) -> Result<String, NepseError> {
        Ok(self.auth.access_token().await?)
    }

    /// Replace the cached token now, e.g. after the server rejected it.
    pub async fn force_refresh(&self) -> Result<(), NepseError> {
        Ok(self.auth.force_refresh().await?)
    }

    /// GET `path` with the access token and decode the JSON body.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NepseError> {
        let text = self.get_raw(path).await?;
        serde_json::from_str(&text).map_err(|e| NepseError::Data(format!("{path}: json parse: {e}")))
    }

    /// GET `path` with the access token and return the body untouched.
    pub async fn get_raw(&self, path: &str) -> Result<String, NepseError> {
        self.get_raw_with_retry(path, None).await
    }

    /// Like [`get_raw`](Self::get_raw) with a per-call retry policy.
    pub async fn get_raw_with_retry(
        &self,
        path: &str,
        retry_override: Option<&RetryConfig>,
    ) -> Result<String, NepseError> {
        let resp = self.authenticated_get(path, retry_override).await?;
        Ok(net::get_text(resp, path).await?)
    }

    /// Send an authenticated GET. On 401 the token is force-refreshed and the request
    /// is sent exactly once more; a second 401 is returned as
    /// [`NepseError::Unauthorized`].
    async fn authenticated_get(
        &self,
        path: &str,
        retry_override: Option<&RetryConfig>,
    ) -> Result<reqwest::Response, NepseError> {
        let url = self.transport.url_for(path)?;
        let mut refreshed = false;

        loop {
            let token = self.auth.access_token().await?;
            let req = apply_auth(self.transport.get(url.clone()), &token);
            let resp = self.transport.send_with_retry(req, retry_override).await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                #[cfg(feature = "tracing")]
                tracing::debug!(url = %url, "token rejected; refreshing and retrying once");
                self.auth.force_refresh().await?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                return Err(NepseError::from_status(status.as_u16(), url.as_str()));
            }
            return Ok(resp);
        }
    }
}
