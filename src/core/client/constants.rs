//! Centralized constants for default endpoints, headers and token lifetime.

use std::time::Duration;

/// Default desktop UA; the exchange rejects requests that do not look like a browser.
pub(crate) const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/120.0.0.0 Safari/537.36 ",
    "nepse-rs/",
    env!("CARGO_PKG_VERSION")
);

/// Exchange web host; every API path is joined onto it.
pub(crate) const DEFAULT_BASE_URL: &str = "https://www.nepalstock.com";

/// Unauthenticated endpoint returning salts and salted tokens.
pub(crate) const TOKEN_PATH: &str = "/api/authenticate/prove";

/// Tokens live for roughly a minute upstream; refresh with 15 s to spare.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(45);

/// Browser fingerprint headers expected on every request.
pub(crate) const FINGERPRINT_HEADERS: &[(&str, &str)] = &[
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
    (
        "Sec-Ch-Ua",
        r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
    ),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", r#""Linux""#),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-origin"),
];
