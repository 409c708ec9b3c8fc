use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Raw body of `GET /api/authenticate/prove`.
///
/// Both token strings carry junk characters at positions derived from the five salts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub salt1: i32,
    pub salt2: i32,
    pub salt3: i32,
    pub salt4: i32,
    pub salt5: i32,
    pub access_token: String,
    /// Only issued by some API generations.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Server clock in milliseconds since the Unix epoch; `0` when absent.
    #[serde(default)]
    pub server_time: i64,
}

impl TokenResponse {
    /// The salts in wire order.
    pub fn salts(&self) -> [i32; 5] {
        [self.salt1, self.salt2, self.salt3, self.salt4, self.salt5]
    }
}

/// Character positions to remove from each obfuscated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIndices {
    pub access: [i32; 5],
    pub refresh: [i32; 5],
}

/// A decoded token and the instant it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub acquired_at: DateTime<Utc>,
}

impl CachedToken {
    /// `true` while the token is non-empty and younger than `ttl` at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        let Ok(ttl) = ChronoDuration::from_std(ttl) else {
            return true;
        };
        now.signed_duration_since(self.acquired_at) < ttl
    }
}
