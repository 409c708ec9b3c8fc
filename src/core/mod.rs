//! Core components of the `nepse-rs` client.
//!
//! This module contains the foundational building blocks of the library, including:
//! - The main [`NepseClient`] and its builder.
//! - The primary [`NepseError`] type and the token-stage [`AuthError`].
//! - The endpoint path table.

/// The main client (`NepseClient`), builder, retry policy and authenticated requests.
pub mod client;
/// Endpoint paths of the exchange API.
pub mod endpoints;
/// Error types (`NepseError`, `AuthError`) and their kinds.
pub mod error;

pub(crate) mod net;

// convenient re-exports so most code can just `use crate::core::NepseClient`
pub use client::{Backoff, NepseClient, NepseClientBuilder, RetryConfig};
pub use endpoints::{Endpoints, IndexKind};
pub use error::{AuthError, AuthErrorKind, EngineError, ErrorKind, NepseError};
