//! Junk-character stripping for salted tokens.

/// Remove the bytes at `positions` from `raw`.
///
/// Positions may arrive in any order and may repeat; each byte is dropped at most
/// once. Positions outside `0..raw.len()` are ignored. An empty position list returns
/// the input unchanged.
///
/// Tokens issued by the exchange are ASCII, so stripping is done on bytes. Should a
/// removal ever split a multi-byte character the result is repaired lossily rather
/// than rejected.
pub fn strip_positions(raw: &str, positions: &[i32]) -> String {
    if positions.is_empty() {
        return raw.to_string();
    }

    let bytes = raw.as_bytes();
    let mut sorted: Vec<usize> = positions
        .iter()
        .filter_map(|&p| usize::try_from(p).ok())
        .filter(|&p| p < bytes.len())
        .collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = Vec::with_capacity(bytes.len() - sorted.len());
    let mut prev = 0;
    for p in sorted {
        out.extend_from_slice(&bytes[prev..p]);
        prev = p + 1;
    }
    out.extend_from_slice(&bytes[prev..]);

    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
