use std::sync::Arc;
use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum NepseError {
    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Obtaining an access token failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The server rejected the access token (HTTP 401), even after one refresh.
    #[error("Unauthorized (token expired) at {url}")]
    Unauthorized {
        /// The URL that returned the error.
        url: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("Not found at {url}")]
    NotFound {
        /// The URL that returned the error.
        url: String,
    },

    /// The request was rate-limited by the server (HTTP 429).
    #[error("Rate limited at {url}")]
    RateLimited {
        /// The URL that returned the error.
        url: String,
    },

    /// The server returned a 5xx error.
    #[error("Server error {status} at {url}")]
    ServerError {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// The server returned an unexpected or unsuccessful HTTP status code.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// The data received from the API was in an unexpected format or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),
}

/// Coarse classification of a [`NepseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 400.
    InvalidClientRequest,
    /// 5xx or an unusable body.
    InvalidServerResponse,
    /// HTTP 401.
    TokenExpired,
    /// Connect, timeout or other transport failure.
    Network,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 429.
    RateLimit,
    /// Token acquisition failed.
    Auth,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Whether an operation failing with this kind may succeed when retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::TokenExpired
                | ErrorKind::Network
                | ErrorKind::InvalidServerResponse
                | ErrorKind::RateLimit
        )
    }
}

impl NepseError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, url: impl Into<String>) -> Self {
        let url = url.into();
        match status {
            401 => NepseError::Unauthorized { url },
            404 => NepseError::NotFound { url },
            429 => NepseError::RateLimited { url },
            500..=599 => NepseError::ServerError { status, url },
            _ => NepseError::Status { status, url },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NepseError::Http(e) if e.is_decode() => ErrorKind::InvalidServerResponse,
            NepseError::Http(e) if e.is_builder() => ErrorKind::Internal,
            NepseError::Http(_) => ErrorKind::Network,
            NepseError::Url(_) => ErrorKind::Internal,
            NepseError::Auth(_) => ErrorKind::Auth,
            NepseError::Unauthorized { .. } => ErrorKind::TokenExpired,
            NepseError::NotFound { .. } => ErrorKind::NotFound,
            NepseError::RateLimited { .. } => ErrorKind::RateLimit,
            NepseError::ServerError { .. } => ErrorKind::InvalidServerResponse,
            NepseError::Status { status: 400, .. } => ErrorKind::InvalidClientRequest,
            NepseError::Status { status: 403, .. } => ErrorKind::Forbidden,
            NepseError::Status { .. } => ErrorKind::Internal,
            NepseError::Data(_) => ErrorKind::InvalidServerResponse,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Failure of token acquisition, tagged by the stage that failed.
///
/// `Clone` so a single in-flight acquisition can hand the same outcome to every waiter.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The index module could not be compiled, instantiated or bound.
    #[error("token module load failed: {0}")]
    ModuleLoad(String),

    /// The token request itself failed (network, non-200 status).
    #[error("token request failed: {0}")]
    Transport(#[source] Arc<NepseError>),

    /// The token endpoint answered with a body that could not be decoded.
    #[error("token response decode failed: {0}")]
    Decode(String),

    /// One of the module functions trapped or was unavailable.
    #[error("token module call `{function}` failed: {source}")]
    Engine {
        function: &'static str,
        #[source]
        source: EngineError,
    },

    /// Acquisition completed but produced an empty access token.
    #[error("empty access token after update")]
    EmptyToken,

    /// The acquisition task did not run to completion.
    #[error("token acquisition aborted: {0}")]
    Aborted(String),
}

/// Failure of a single index-function call.
///
/// Keeps the runtime's own error (a wasmtime trap, for instance) as its source.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::from(source.into())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The tag of an [`AuthError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    ModuleLoad,
    Transport,
    Decode,
    Engine,
    EmptyToken,
    Aborted,
}

impl AuthErrorKind {
    /// Only transport failures may clear up on their own.
    pub fn is_retryable(self) -> bool {
        matches!(self, AuthErrorKind::Transport | AuthErrorKind::Aborted)
    }

    /// Decode and engine failures usually mean the upstream protocol changed.
    pub fn is_protocol_change(self) -> bool {
        matches!(self, AuthErrorKind::Decode | AuthErrorKind::Engine)
    }
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::ModuleLoad(_) => AuthErrorKind::ModuleLoad,
            AuthError::Transport(_) => AuthErrorKind::Transport,
            AuthError::Decode(_) => AuthErrorKind::Decode,
            AuthError::Engine { .. } => AuthErrorKind::Engine,
            AuthError::EmptyToken => AuthErrorKind::EmptyToken,
            AuthError::Aborted(_) => AuthErrorKind::Aborted,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Classify a failure reported by a [`TokenSource`](crate::auth::TokenSource).
    pub(crate) fn from_source(err: NepseError) -> Self {
        match err {
            NepseError::Data(msg) => AuthError::Decode(msg),
            NepseError::Http(e) if e.is_decode() => AuthError::Decode(e.to_string()),
            NepseError::Auth(inner) => inner,
            other => AuthError::Transport(Arc::new(other)),
        }
    }
}

impl PartialEq for AuthError {
    /// Errors compare equal by kind.
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}
