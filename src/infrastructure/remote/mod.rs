//! Remote-API response header parsing.

mod headers;

pub use headers::parse_rate_limit_headers;
