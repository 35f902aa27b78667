use clap::Parser;
use std::env;
use tracing::warn;

// CLI argument structure. Tunables live here; secrets come from the
// environment (see the helpers below) so they never show up in `ps`.
#[derive(Parser, Debug, Clone)]
#[command(name = "waitlist-service")]
#[command(about = "Waitlist signup and stats API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Base URL of the REST persistence store (e.g. https://xyz.supabase.co).
    // When omitted, an in-memory store is used (dev mode, nothing persists).
    #[arg(long)]
    pub store_url: Option<String>,

    // Rate limit: max submissions per client per window
    #[arg(long, default_value_t = 3)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 3600)]
    pub rate_window: u64,

    // Expired-entry sweep interval in seconds
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Disable submission rate limiting entirely
    #[arg(long, default_value_t = false)]
    pub no_rate_limit: bool,

    // Rows in the stats recent-activity list
    #[arg(long, default_value_t = 25)]
    pub recent_limit: usize,

    // Upper bound on rows fetched for the stats frequency tables
    #[arg(long, default_value_t = 20_000)]
    pub stats_row_cap: usize,
}

// Optional secret from the environment, with a warning when absent so a
// misconfigured deployment is visible in the logs.
pub fn env_secret(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            warn!("{key} not set");
            None
        }
    }
}
