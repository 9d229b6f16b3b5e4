//! `Retry-After` and rate-limit header handling (spec §4.1.4).

use http::{HeaderMap, StatusCode};
use std::time::{Duration, SystemTime};

/// Header names consulted for a server-directed retry delay, in precedence
/// order: the first present wins.
const RETRY_DELAY_HEADERS: [&str; 4] = [
    "retry-after",
    "ratelimit-reset",
    "x-ratelimit-reset",
    "x-rate-limit-reset",
];

/// Statuses for which `Retry-After`-style headers are consulted.
pub fn applies_to(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Extracts a server-directed delay from the first present header in
/// [`RETRY_DELAY_HEADERS`], interpreting a finite number as seconds-from-now
/// and anything else as an HTTP-date.
pub fn parse_retry_delay(headers: &HeaderMap) -> Option<Duration> {
    for name in RETRY_DELAY_HEADERS {
        if let Some(value) = headers.get(name) {
            if let Ok(text) = value.to_str() {
                if let Some(delay) = parse_delay_value(text) {
                    return Some(delay);
                }
            }
        }
    }
    None
}

fn parse_delay_value(text: &str) -> Option<Duration> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<f64>() {
        if seconds.is_finite() {
            return Some(Duration::from_secs_f64(seconds.max(0.0)));
        }
    }

    let target = httpdate::parse_http_date(text).ok()?;
    let now = SystemTime::now();
    Some(target.duration_since(now).unwrap_or(Duration::ZERO))
}

/// Clamps a server-directed retry delay against the overall deadline's
/// remaining budget, per spec §4.1.4: if honoring the delay in full would
/// leave less than a 5-second safety margin before the deadline, the delay
/// is clamped to `max(0, remaining - 5s)` so the next attempt still has a
/// chance to run. Returns `(clamped_delay, was_clamped)`.
pub fn clamp_to_deadline(delay: Duration, remaining_total: Option<Duration>) -> (Duration, bool) {
    const SAFETY_MARGIN: Duration = Duration::from_secs(5);

    let Some(remaining) = remaining_total else {
        return (delay, false);
    };

    if remaining.saturating_sub(delay) >= SAFETY_MARGIN {
        return (delay, false);
    }

    let clamped = remaining.saturating_sub(SAFETY_MARGIN);
    (clamped, clamped != delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn numeric_retry_after_is_seconds_from_now() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("0.4"));
        let delay = parse_retry_delay(&headers).unwrap();
        assert_eq!(delay, Duration::from_millis(400));
    }

    #[test]
    fn first_present_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-reset", HeaderValue::from_static("5"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("500"));
        let delay = parse_retry_delay(&headers).unwrap();
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn http_date_is_interpreted_as_an_absolute_time() {
        let target = SystemTime::now() + Duration::from_secs(60);
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(target)).unwrap(),
        );
        let delay = parse_retry_delay(&headers).unwrap();
        assert!(delay.as_secs() >= 58 && delay.as_secs() <= 61);
    }

    #[test]
    fn clamp_leaves_full_delay_when_margin_is_sufficient() {
        let (delay, clamped) =
            clamp_to_deadline(Duration::from_secs(10), Some(Duration::from_secs(60)));
        assert_eq!(delay, Duration::from_secs(10));
        assert!(!clamped);
    }

    #[test]
    fn clamp_shrinks_delay_to_preserve_safety_margin() {
        let (delay, clamped) =
            clamp_to_deadline(Duration::from_secs(60), Some(Duration::from_secs(10)));
        assert_eq!(delay, Duration::from_secs(5));
        assert!(clamped);
    }

    #[test]
    fn clamp_floors_at_zero() {
        let (delay, clamped) =
            clamp_to_deadline(Duration::from_secs(60), Some(Duration::from_secs(2)));
        assert_eq!(delay, Duration::ZERO);
        assert!(clamped);
    }

    #[test]
    fn applies_to_429_and_503_only() {
        assert!(applies_to(StatusCode::TOO_MANY_REQUESTS));
        assert!(applies_to(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!applies_to(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
