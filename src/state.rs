use std::sync::Arc;

use crate::rate_limit::RateLimiter;
use crate::store::WaitlistStore;

// App's shared state. The store and limiter are built once in main and
// injected; handlers never construct their own collaborators.
pub struct AppState {
    pub store: Arc<dyn WaitlistStore>,
    pub limiter: Option<Arc<RateLimiter>>, // None when --no-rate-limit
    pub recent_limit: usize,
    pub stats_row_cap: usize,
    pub admin_password: Option<String>,
}
