use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::metrics::{
    RATE_LIMITED_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL, SIGNUP_FAILURES, SIGNUPS_TOTAL,
};
use crate::models::{SignupRequest, SignupResponse};
use crate::rate_limit::{RateLimitDecision, client_ip, client_key};
use crate::service::submit;
use crate::state::AppState;

// X-RateLimit-* metadata echoed on throttled and successful responses
fn rate_limit_headers(response: &mut Response, max: u32, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    let entries = [
        ("x-ratelimit-limit", max.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        (
            "x-ratelimit-reset",
            decision.reset_time.timestamp_millis().to_string(),
        ),
    ];
    for (name, value) in entries {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SignupRequest>,
) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    // Throttle before touching the body. The limiter is optional middleware
    // in front of the submission service, not part of it.
    let mut decision = None;
    if let Some(limiter) = &state.limiter {
        let ip = client_ip(&headers);
        let checked = limiter.check(&client_key(&ip));
        if !checked.allowed {
            RATE_LIMITED_TOTAL.inc();
            let mut response = ApiError::RateLimited {
                retry_after_secs: checked.retry_after_secs,
            }
            .into_response();
            rate_limit_headers(&mut response, limiter.max(), &checked);
            return response;
        }
        decision = Some(checked);
    }

    let result = submit(state.store.as_ref(), payload).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            SIGNUPS_TOTAL.inc();
            let mut response = Json(SignupResponse {
                success: true,
                message: "Successfully joined the waitlist!".to_string(),
            })
            .into_response();
            if let (Some(limiter), Some(decision)) = (&state.limiter, &decision) {
                rate_limit_headers(&mut response, limiter.max(), decision);
            }
            response
        }
        Err(err) => {
            SIGNUP_FAILURES.inc();
            err.into_response()
        }
    }
}
