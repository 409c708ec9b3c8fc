//! Cached access token with single-flight refresh.
//!
//! At most one acquisition runs per manager. It is spawned onto the runtime and shared
//! through a [`Shared`] future, so every caller that arrives while it is in flight gets
//! the same outcome, and a caller giving up (dropping its future, hitting a timeout)
//! does not cancel the request for the others.

use super::codec::strip_positions;
use super::engine::{IndexFunctions, compute_indices};
use super::model::{CachedToken, TokenResponse};
use super::{Clock, SystemClock, TokenSource};
use crate::core::client::constants::DEFAULT_TOKEN_TTL;
use crate::core::error::AuthError;
use chrono::{TimeZone, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;

type Outcome = Result<Arc<CachedToken>, AuthError>;
type Flight = Shared<BoxFuture<'static, Outcome>>;

/// Whether a flight may settle for a cached token that became valid again.
///
/// Starts as `MAY_REUSE` for ordinary acquisitions. A forced caller joining the flight
/// moves it to `FORCED`; the flight itself moves it to `REUSED` when it returns the
/// cached token without fetching. Both transitions happen once.
struct FlightMode(AtomicU8);

const MAY_REUSE: u8 = 0;
const FORCED: u8 = 1;
const REUSED: u8 = 2;

impl FlightMode {
    fn new(force: bool) -> Self {
        Self(AtomicU8::new(if force { FORCED } else { MAY_REUSE }))
    }

    /// Make the flight fetch. `false` if it already settled on the cached token.
    fn force(&self) -> bool {
        match self
            .0
            .compare_exchange(MAY_REUSE, FORCED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == FORCED,
        }
    }

    /// Settle on the cached token unless a forced caller got here first.
    fn reuse(&self) -> bool {
        self.0
            .compare_exchange(MAY_REUSE, REUSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

struct InFlight {
    id: u64,
    flight: Flight,
    mode: Arc<FlightMode>,
}

struct Inner {
    source: Arc<dyn TokenSource>,
    functions: Arc<dyn IndexFunctions>,
    clock: Arc<dyn Clock>,
    ttl: Duration,

    token: RwLock<Option<Arc<CachedToken>>>,
    in_flight: Mutex<Option<InFlight>>,
    next_flight: AtomicU64,
    closed: AtomicBool,
}

/// Holds the current access token and refreshes it on demand.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("ttl", &self.inner.ttl)
            .field("closed", &self.inner.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// A manager with the default TTL and the system clock.
    pub fn new(source: Arc<dyn TokenSource>, functions: Arc<dyn IndexFunctions>) -> Self {
        Self::builder(source, functions).build()
    }

    pub fn builder(
        source: Arc<dyn TokenSource>,
        functions: Arc<dyn IndexFunctions>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder {
            source,
            functions,
            clock: None,
            ttl: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return a valid access token, acquiring one first if the cache is empty or stale.
    ///
    /// Never performs I/O while the cached token is valid.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(tok) = self.inner.valid_cached().await {
            return Ok(tok.access_token.clone());
        }
        let tok = self.join_flight(false).await?;
        Ok(tok.access_token.clone())
    }

    /// Acquire a new token even if the cached one has not expired yet.
    ///
    /// Joins an acquisition that is already in flight instead of starting a second one.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn force_refresh(&self) -> Result<(), AuthError> {
        self.join_flight(true).await.map(|_| ())
    }

    /// Snapshot of the cached token, valid or not.
    pub async fn cached(&self) -> Option<CachedToken> {
        self.inner.token.read().await.as_deref().cloned()
    }

    /// Release the index module and drop the cached token. Safe to call more than once.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.functions.release();
        self.inner.token.write().await.take();
        #[cfg(feature = "tracing")]
        tracing::debug!("token manager closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Join the running acquisition or start one.
    ///
    /// A forced caller never settles for a flight that returns the cached token: it
    /// upgrades the flight to fetch, or waits it out and starts a forced one.
    async fn join_flight(&self, force: bool) -> Outcome {
        loop {
            if self.is_closed() {
                return Err(AuthError::Aborted("token manager is closed".into()));
            }

            let (flight, joined) = {
                let mut slot = self
                    .inner
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    Some(running) if !force || running.mode.force() => {
                        (running.flight.clone(), true)
                    }
                    Some(running) => (running.flight.clone(), false),
                    None => {
                        let running = Inner::spawn_flight(Arc::clone(&self.inner), force);
                        let flight = running.flight.clone();
                        *slot = Some(running);
                        (flight, true)
                    }
                }
            };

            if joined {
                return flight.await;
            }
            #[cfg(feature = "tracing")]
            tracing::trace!("flight settled on the cached token; waiting to force a new one");
            let _ = flight.await;
        }
    }
}

/// Clears the in-flight slot when the acquisition task ends, however it ends.
struct FlightGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if matches!(slot.as_ref(), Some(running) if running.id == self.id) {
            slot.take();
        }
    }
}

impl Inner {
    /// Spawn an acquisition. Must be called with the in-flight slot locked.
    fn spawn_flight(inner: Arc<Inner>, force: bool) -> InFlight {
        let id = inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let mode = Arc::new(FlightMode::new(force));

        let task_mode = Arc::clone(&mode);
        let handle = tokio::spawn(async move {
            let _guard = FlightGuard {
                inner: Arc::clone(&inner),
                id,
            };
            inner.acquire(&task_mode).await
        });

        let flight = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AuthError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        InFlight { id, flight, mode }
    }

    async fn valid_cached(&self) -> Option<Arc<CachedToken>> {
        let guard = self.token.read().await;
        let tok = guard.as_ref()?;
        if tok.is_valid_at(self.clock.now(), self.ttl) {
            #[cfg(feature = "tracing")]
            tracing::trace!("token cache hit");
            Some(Arc::clone(tok))
        } else {
            None
        }
    }

    async fn acquire(&self, mode: &FlightMode) -> Outcome {
        // Another round may have refreshed the token between the caller's miss and now.
        if let Some(tok) = self.valid_cached().await
            && mode.reuse()
        {
            return Ok(tok);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("acquiring access token");

        let resp = self
            .source
            .fetch_raw_token()
            .await
            .map_err(AuthError::from_source)?;
        let token = Arc::new(self.decode(&resp)?);

        *self.token.write().await = Some(Arc::clone(&token));

        #[cfg(feature = "tracing")]
        tracing::debug!(acquired_at = %token.acquired_at, "access token updated");

        Ok(token)
    }

    fn decode(&self, resp: &TokenResponse) -> Result<CachedToken, AuthError> {
        let indices = compute_indices(self.functions.as_ref(), resp.salts())?;

        let access_token = strip_positions(&resp.access_token, &indices.access);
        if access_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        let refresh_token = resp
            .refresh_token
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| strip_positions(r, &indices.refresh));

        // Anchor on the server clock (whole seconds) to tolerate local skew.
        let acquired_at = (resp.server_time > 0)
            .then(|| Utc.timestamp_opt(resp.server_time / 1000, 0).single())
            .flatten()
            .unwrap_or_else(|| self.clock.now());

        Ok(CachedToken {
            access_token,
            refresh_token,
            acquired_at,
        })
    }
}

/// Configures a [`TokenManager`].
pub struct TokenManagerBuilder {
    source: Arc<dyn TokenSource>,
    functions: Arc<dyn IndexFunctions>,
    clock: Option<Arc<dyn Clock>>,
    ttl: Option<Duration>,
}

impl TokenManagerBuilder {
    /// How long a token is served from cache. Default: 45 seconds.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replace the system clock, e.g. to test expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> TokenManager {
        TokenManager {
            inner: Arc::new(Inner {
                source: self.source,
                functions: self.functions,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                ttl: self.ttl.unwrap_or(DEFAULT_TOKEN_TTL),
                token: RwLock::new(None),
                in_flight: Mutex::new(None),
                next_flight: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }
}
