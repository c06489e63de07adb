//! Rate limiting module using Token Bucket algorithm.
//!
//! Protects the notification and push routes from request floods. Buckets are
//! kept in memory per client key (API key header or peer address).

mod limiter;
mod token_bucket;

pub use limiter::{RateLimitResult, RateLimiter, RateLimiterStats};
pub use token_bucket::TokenBucket;
