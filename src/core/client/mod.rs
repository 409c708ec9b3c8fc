//! Public client surface + builder.
//! Internals are split into `auth` (token endpoint + authenticated requests),
//! `constants` (UA + defaults) and `retry` (backoff policy).

mod auth;
pub(crate) mod constants;
mod retry;

pub use constants::DEFAULT_TOKEN_TTL;
pub use retry::{Backoff, RetryConfig};

use crate::auth::{IndexFunctions, TokenManager, WasmIndexFunctions};
use crate::core::{AuthError, Endpoints, NepseError};
use constants::{DEFAULT_BASE_URL, FINGERPRINT_HEADERS, USER_AGENT};
use reqwest::Client;
use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP plumbing shared by the client and its token manager.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: Client,
    base_url: Url,
    retry: RetryConfig,
}

impl Transport {
    pub(crate) fn url_for(&self, path: &str) -> Result<Url, NepseError> {
        Ok(self.base_url.join(path)?)
    }

    /// A GET carrying the browser headers the exchange expects.
    pub(crate) fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let origin = self.base_url.origin().ascii_serialization();
        let mut req = self
            .http
            .get(url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ORIGIN, origin.as_str())
            .header(REFERER, format!("{origin}/"));
        for (name, value) in FINGERPRINT_HEADERS {
            req = req.header(*name, *value);
        }
        req
    }

    /// Send `req`, retrying transient failures per the retry policy.
    ///
    /// When the retry budget runs out on a retryable status, the last response is returned
    /// so the caller can map its status.
    pub(crate) async fn send_with_retry(
        &self,
        req: reqwest::RequestBuilder,
        retry_override: Option<&RetryConfig>,
    ) -> Result<reqwest::Response, NepseError> {
        let cfg = retry_override.unwrap_or(&self.retry);
        let mut attempt: u32 = 0;

        loop {
            let Some(this) = req.try_clone() else {
                return Ok(req.send().await?);
            };

            match this.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < cfg.max_retries && cfg.should_retry_status(status) {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(status, attempt, url = %resp.url(), "retrying after status");
                        tokio::time::sleep(cfg.backoff.delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    if attempt < cfg.max_retries && cfg.should_retry_error(&e) {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(error = %e, attempt, "retrying after transport error");
                        tokio::time::sleep(cfg.backoff.delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

/// Client for the NEPSE API.
///
/// Cheap to clone; clones share the HTTP connection pool and the access token.
#[derive(Debug, Clone)]
pub struct NepseClient {
    transport: Transport,
    endpoints: Arc<Endpoints>,
    auth: TokenManager,
}

impl NepseClient {
    /// Create a new builder.
    pub fn builder() -> NepseClientBuilder {
        NepseClientBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.transport.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The token cache backing this client.
    pub fn token_manager(&self) -> &TokenManager {
        &self.auth
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.transport.retry
    }

    /// Release the token module. Call once when the client is no longer needed;
    /// authenticated requests fail afterwards.
    pub async fn close(&self) {
        self.auth.close().await;
    }
}

/* ----------------------- Builder ----------------------- */

enum ModuleSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Functions(Arc<dyn IndexFunctions>),
}

/// Configures a [`NepseClient`].
#[derive(Default)]
pub struct NepseClientBuilder {
    user_agent: Option<String>,
    base_url: Option<Url>,
    endpoints: Option<Endpoints>,
    module: Option<ModuleSource>,

    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    token_ttl: Option<Duration>,
    accept_invalid_certs: bool,
}

impl NepseClientBuilder {
    /// Override the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Override the API host (e.g., `https://www.nepalstock.com`).
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Override individual endpoint paths.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Token module as WebAssembly binary or WAT text.
    pub fn wasm_module(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.module = Some(ModuleSource::Bytes(bytes.into()));
        self
    }

    /// Load the token module from a file when the client is built.
    pub fn wasm_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module = Some(ModuleSource::Path(path.into()));
        self
    }

    /// Use a custom function table instead of a WebAssembly module.
    pub fn index_functions(mut self, functions: Arc<dyn IndexFunctions>) -> Self {
        self.module = Some(ModuleSource::Functions(functions));
        self
    }

    /// Set a global request timeout (overall). Default: none.
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Replace the retry policy.
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = Some(cfg);
        self
    }

    /// Turn automatic retries on or off, keeping the rest of the policy.
    pub fn retry_enabled(mut self, enabled: bool) -> Self {
        self.retry.get_or_insert_with(RetryConfig::default).enabled = enabled;
        self
    }

    /// How long an access token is reused before a new one is requested. Default: 45 s.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Verify TLS certificates (default `true`). The exchange has served broken chains before.
    pub fn tls_verification(mut self, verify: bool) -> Self {
        self.accept_invalid_certs = !verify;
        self
    }

    pub fn build(self) -> Result<NepseClient, NepseError> {
        let base_url = match self.base_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let mut httpb = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT))
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(t) = self.timeout {
            httpb = httpb.timeout(t);
        }
        if let Some(ct) = self.connect_timeout {
            httpb = httpb.connect_timeout(ct);
        }

        let transport = Transport {
            http: httpb.build()?,
            base_url,
            retry: self.retry.unwrap_or_default(),
        };

        let functions = load_functions(self.module)?;
        let auth = TokenManager::builder(Arc::new(transport.clone()), functions)
            .ttl(self.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL))
            .build();

        Ok(NepseClient {
            transport,
            endpoints: Arc::new(self.endpoints.unwrap_or_default()),
            auth,
        })
    }
}

fn load_functions(source: Option<ModuleSource>) -> Result<Arc<dyn IndexFunctions>, AuthError> {
    match source {
        Some(ModuleSource::Functions(f)) => Ok(f),
        Some(ModuleSource::Bytes(b)) => Ok(Arc::new(WasmIndexFunctions::from_bytes(b)?)),
        Some(ModuleSource::Path(p)) => Ok(Arc::new(WasmIndexFunctions::from_file(p)?)),
        #[cfg(feature = "embedded-module")]
        None => Ok(Arc::new(WasmIndexFunctions::embedded()?)),
        #[cfg(not(feature = "embedded-module"))]
        None => Err(AuthError::ModuleLoad(
            "no token module configured; use `wasm_module`, `wasm_module_path` or enable `embedded-module`"
                .into(),
        )),
    }
}
