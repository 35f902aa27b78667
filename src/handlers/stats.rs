use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::StatsResponse;
use crate::state::AppState;
use crate::stats::build_stats;

// Always 200: read failures degrade inside build_stats rather than
// surfacing an error to the dashboard.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(build_stats(state.store.as_ref(), state.stats_row_cap, state.recent_limit).await)
}
