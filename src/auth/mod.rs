//! Access-token acquisition for the NEPSE API.
//!
//! The token endpoint returns salted tokens: real characters interleaved with junk at
//! positions that only the exchange's own client-side module can compute. This module
//! decodes them and keeps one valid token per client.
//!
//! - [`codec`] strips junk characters given their positions.
//! - [`engine`] holds the salt permutation table and the [`IndexFunctions`] seam.
//! - [`wasm`] runs the real module under wasmtime.
//! - [`manager`] caches the token and collapses concurrent refreshes into one request.

pub mod codec;
pub mod engine;
pub mod manager;
pub mod model;
pub mod wasm;

use crate::core::NepseError;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

pub use codec::strip_positions;
pub use engine::{IndexFn, IndexFunctions, compute_indices};
pub use manager::TokenManager;
pub use model::{CachedToken, TokenIndices, TokenResponse};
pub use wasm::WasmIndexFunctions;

/// Scheme used in the `Authorization` header instead of `Bearer`.
pub const AUTH_SCHEME: &str = "Salter";

/// Format a decoded token as an `Authorization` header value.
pub fn authorization_value(token: &str) -> String {
    format!("{AUTH_SCHEME} {token}")
}

/// Attach `Authorization: Salter <token>` to a request.
pub fn apply_auth(req: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
    req.header(reqwest::header::AUTHORIZATION, authorization_value(token))
}

/// Performs the raw, unauthenticated token request.
///
/// The client implements this over `GET /api/authenticate/prove`. Non-200 statuses should be
/// reported as status errors and undecodable bodies as [`NepseError::Data`], so that the
/// manager can tell transport failures from protocol changes.
pub trait TokenSource: Send + Sync {
    fn fetch_raw_token<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<TokenResponse, NepseError>> + Send + 'a>>;
}

/// Wall-clock source for token age checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
