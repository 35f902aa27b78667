use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "waitlist_requests_total",
        "Total submission requests received"
    )
    .unwrap();
    pub static ref SIGNUPS_TOTAL: Counter =
        register_counter!("waitlist_signups_total", "Signups accepted and stored").unwrap();
    pub static ref SIGNUP_FAILURES: Counter = register_counter!(
        "waitlist_signup_failures_total",
        "Submissions rejected (validation, duplicate, store)"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "waitlist_rate_limited_total",
        "Submissions denied by the rate limiter"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "waitlist_request_latency_seconds",
        "Submission request latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge = register_gauge!(
        "waitlist_rate_limit_keys",
        "Client keys currently tracked by the rate limiter"
    )
    .unwrap();
}
