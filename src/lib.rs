//! nepse-rs: async client for the Nepal Stock Exchange API.
//!
//! Every API call needs a short-lived access token. The token endpoint hands out salted
//! tokens whose junk characters can only be located by the exchange's own WebAssembly
//! module; [`auth`] runs that module, strips the junk and caches the result so that
//! concurrent requests share one token and one refresh.
//!
//! ```no_run
//! # async fn run() -> Result<(), nepse_rs::NepseError> {
//! let client = nepse_rs::NepseClient::builder()
//!     .wasm_module_path("css.wasm")
//!     .build()?;
//! let summary: serde_json::Value = client
//!     .get_json(&client.endpoints().market_summary)
//!     .await?;
//! println!("{summary}");
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod core;

pub use crate::auth::{CachedToken, TokenManager, TokenResponse, TokenSource, WasmIndexFunctions};
pub use crate::core::{
    AuthError, AuthErrorKind, Backoff, EngineError, Endpoints, ErrorKind, IndexKind, NepseClient,
    NepseClientBuilder, NepseError, RetryConfig,
};
