//! Middleware for request logging and rate limiting.

pub mod logging;
pub mod rate_limit;

pub use logging::{request_logging, RequestUser};
pub use rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitLayer};
