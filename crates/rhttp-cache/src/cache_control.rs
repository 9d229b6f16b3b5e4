//! `Cache-Control`/`Expires`/`Age` parsing (spec §4.3).

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A directive that is either a duration in seconds or a boolean flag
/// (`true` meaning "infinite"/"always", `false` meaning "zero"/"never").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DurationOrBool {
    /// An explicit number of seconds.
    Seconds(u64),
    /// `true` (infinite) or `false` (zero/disabled).
    Bool(bool),
}

impl DurationOrBool {
    /// Resolves to a concrete second count, treating `true` as `u64::MAX`
    /// and `false` as `0`.
    pub fn as_seconds(self) -> u64 {
        match self {
            DurationOrBool::Seconds(s) => s,
            DurationOrBool::Bool(true) => u64::MAX,
            DurationOrBool::Bool(false) => 0,
        }
    }

    /// `true` iff this directive is effectively disabled (`false` or `0`).
    pub fn is_disabled(self) -> bool {
        matches!(self, DurationOrBool::Bool(false)) || matches!(self, DurationOrBool::Seconds(0))
    }
}

/// Normalized `Cache-Control` directives, merged from request defaults,
/// response headers, and request-forced overrides (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheControlRecord {
    /// `max-age`, or an `Expires`-derived equivalent.
    pub max_age: Option<DurationOrBool>,
    /// `no-cache`.
    pub no_cache: Option<bool>,
    /// `no-store`.
    pub no_store: Option<bool>,
    /// `must-revalidate`.
    pub must_revalidate: Option<bool>,
    /// `stale-while-revalidate`.
    pub stale_while_revalidate: Option<DurationOrBool>,
    /// `stale-if-error`.
    pub stale_if_error: Option<DurationOrBool>,
}

impl CacheControlRecord {
    /// Merges `self` (earlier/lower precedence) with `other` (later/higher
    /// precedence): fields present in `other` win.
    pub fn merged_with(&self, other: &CacheControlRecord) -> CacheControlRecord {
        CacheControlRecord {
            max_age: other.max_age.or(self.max_age),
            no_cache: other.no_cache.or(self.no_cache),
            no_store: other.no_store.or(self.no_store),
            must_revalidate: other.must_revalidate.or(self.must_revalidate),
            stale_while_revalidate: other.stale_while_revalidate.or(self.stale_while_revalidate),
            stale_if_error: other.stale_if_error.or(self.stale_if_error),
        }
    }
}

/// Parses the effective directives out of a response's headers. Falls back
/// to `Expires` when `Cache-Control` is absent, and subtracts a finite
/// `Age` header from `max-age` when both are present.
pub fn parse_from_headers(headers: &HeaderMap, now: SystemTime) -> CacheControlRecord {
    let mut record = match headers.get(http::header::CACHE_CONTROL) {
        Some(value) => value
            .to_str()
            .map(parse_cache_control)
            .unwrap_or_default(),
        None => expires_as_max_age(headers, now),
    };

    if let (Some(DurationOrBool::Seconds(max_age)), Some(age)) =
        (record.max_age, parse_age(headers))
    {
        record.max_age = Some(DurationOrBool::Seconds(max_age.saturating_sub(age)));
    }

    record
}

/// Parses a raw `Cache-Control` header value.
pub fn parse_cache_control(header: &str) -> CacheControlRecord {
    let mut record = CacheControlRecord::default();

    for token in header.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let mut parts = token.splitn(2, '=');
        let key = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let value = parts.next().map(str::trim);

        match key.as_str() {
            "no-cache" => record.no_cache = Some(true),
            "no-store" => record.no_store = Some(true),
            "must-revalidate" => record.must_revalidate = Some(true),
            "max-age" => record.max_age = value.and_then(parse_seconds).map(DurationOrBool::Seconds),
            "stale-while-revalidate" => {
                record.stale_while_revalidate =
                    value.and_then(parse_seconds).map(DurationOrBool::Seconds)
            }
            "stale-if-error" => {
                record.stale_if_error = value.and_then(parse_seconds).map(DurationOrBool::Seconds)
            }
            _ => {}
        }
    }

    record
}

fn parse_seconds(value: &str) -> Option<u64> {
    value.trim_matches('"').parse::<u64>().ok()
}

fn parse_age(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::AGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|age| age.is_finite())
        .map(|age| age.max(0.0) as u64)
}

fn expires_as_max_age(headers: &HeaderMap, now: SystemTime) -> CacheControlRecord {
    let mut record = CacheControlRecord::default();
    let Some(expires) = headers.get(http::header::EXPIRES).and_then(|v| v.to_str().ok()) else {
        return record;
    };
    let Ok(target) = httpdate::parse_http_date(expires) else {
        return record;
    };

    let seconds = target
        .duration_since(now)
        .map(|d| d.as_secs_f64().round().max(0.0) as u64)
        .unwrap_or(0);
    record.max_age = Some(DurationOrBool::Seconds(seconds));
    record
}
