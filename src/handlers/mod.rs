mod health;
mod metrics;
mod stats;
mod waitlist;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use stats::stats_handler;
pub use waitlist::signup_handler;
