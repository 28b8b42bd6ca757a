//! Parses `X-RateLimit-*` response headers into a [`RateLimitInfo`].
//!
//! Grounded in the header-driven rate limit parsers used by GitHub-API
//! client crates: three primary headers are required (`limit`, `remaining`,
//! `reset`); anything missing or non-numeric means this response simply
//! isn't from the remote API, so parsing degrades to `None` rather than
//! erroring.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::domain::{ApiType, RateLimitInfo};

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_USED: &str = "x-ratelimit-used";
const HEADER_COST: &str = "x-ratelimit-cost";

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn header_unix_seconds(headers: &HeaderMap, name: &str) -> Option<DateTime<Utc>> {
    let raw: i64 = headers.get(name)?.to_str().ok()?.trim().parse().ok()?;
    DateTime::from_timestamp(raw, 0)
}

/// Parse the three primary rate-limit headers (and the type-specific
/// optional fourth) into a [`RateLimitInfo`]. Header lookups are
/// case-insensitive by construction of [`HeaderMap`].
///
/// Returns `None` if `limit`, `remaining`, or `reset` is absent or
/// unparsable — per §4.2, this is expected for responses that simply
/// aren't from the remote API, and is silently skipped by callers.
pub fn parse_rate_limit_headers(
    headers: &HeaderMap,
    api_type: ApiType,
    observed_at: DateTime<Utc>,
) -> Option<RateLimitInfo> {
    let limit = header_u32(headers, HEADER_LIMIT)?;
    let remaining = header_u32(headers, HEADER_REMAINING)?;
    let reset_at = header_unix_seconds(headers, HEADER_RESET)?;

    let info = RateLimitInfo::new(api_type, limit, remaining, reset_at, observed_at);

    Some(match api_type {
        ApiType::Rest => match header_u32(headers, HEADER_USED) {
            Some(used) => info.with_used(used),
            None => info,
        },
        ApiType::GraphQl => match header_u32(headers, HEADER_COST) {
            Some(cost) => info.with_cost(cost),
            None => info,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn parses_rest_headers_case_insensitively() {
        let h = headers(&[
            ("X-RateLimit-Limit", "5000"),
            ("X-RateLimit-Remaining", "4999"),
            ("X-RateLimit-Reset", "1700000000"),
            ("X-RateLimit-Used", "1"),
        ]);
        let info = parse_rate_limit_headers(&h, ApiType::Rest, Utc::now()).unwrap();
        assert_eq!(info.limit, 5000);
        assert_eq!(info.remaining, 4999);
        assert_eq!(info.used, Some(1));
    }

    #[test]
    fn parses_graphql_cost_as_optional_fourth_field() {
        let h = headers(&[
            ("x-ratelimit-limit", "5000"),
            ("x-ratelimit-remaining", "4990"),
            ("x-ratelimit-reset", "1700000000"),
            ("x-ratelimit-cost", "10"),
        ]);
        let info = parse_rate_limit_headers(&h, ApiType::GraphQl, Utc::now()).unwrap();
        assert_eq!(info.cost, Some(10));
        assert_eq!(info.used, None);
    }

    #[test]
    fn missing_primary_header_skips_silently() {
        let h = headers(&[("x-ratelimit-limit", "5000")]);
        assert!(parse_rate_limit_headers(&h, ApiType::Rest, Utc::now()).is_none());
    }

    #[test]
    fn malformed_primary_header_skips_silently() {
        let h = headers(&[
            ("x-ratelimit-limit", "not-a-number"),
            ("x-ratelimit-remaining", "10"),
            ("x-ratelimit-reset", "1700000000"),
        ]);
        assert!(parse_rate_limit_headers(&h, ApiType::Rest, Utc::now()).is_none());
    }

    #[test]
    fn missing_optional_field_still_parses() {
        let h = headers(&[
            ("x-ratelimit-limit", "100"),
            ("x-ratelimit-remaining", "50"),
            ("x-ratelimit-reset", "1700000000"),
        ]);
        let info = parse_rate_limit_headers(&h, ApiType::Rest, Utc::now()).unwrap();
        assert_eq!(info.used, None);
    }
}
