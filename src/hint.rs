use std::time::SystemTime;

use reqwest::header::RETRY_AFTER;

use crate::HttpResponse;

/// Reads the server's `Retry-After` hint from `response`, in milliseconds.
///
/// Returns `None` when the header is missing or unparsable.
pub fn parse_retry_hint(response: &HttpResponse, now: SystemTime) -> Option<u64> {
    parse_retry_after(response.header(RETRY_AFTER.as_str())?, now)
}

/// Parses a raw `Retry-After` value relative to `now`.
///
/// Accepts delay-seconds (`"120"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Dates in the past yield `Some(0)`.
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        let seconds: u64 = value.parse().ok()?;
        return Some(seconds.saturating_mul(1_000));
    }

    let instant = httpdate::parse_http_date(value).ok()?;
    let millis = instant
        .duration_since(now)
        .map(|remaining| remaining.as_millis())
        .unwrap_or(0);
    Some(u64::try_from(millis).unwrap_or(u64::MAX))
}
