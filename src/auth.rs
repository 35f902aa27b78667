use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;

use crate::state::AppState;

// Single shared-password HTTP Basic gate for the dashboard routes. Any
// username is accepted; only the password is checked. Not a multi-user
// auth system and not meant to be one.

fn unauthorized() -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Admin Dashboard\", charset=\"UTF-8\""),
    );
    response
}

pub fn password_matches(auth_header: Option<&str>, expected: &str) -> bool {
    let Some(value) = auth_header else {
        return false;
    };
    let Some(encoded) = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    match credentials.split_once(':') {
        Some((_user, password)) => !password.is_empty() && password == expected,
        None => false,
    }
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    // gate disabled when no password is configured (local dev)
    let Some(expected) = &state.admin_password else {
        return next.run(request).await;
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if password_matches(header_value, expected) {
        next.run(request).await
    } else {
        unauthorized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    #[test]
    fn accepts_correct_password_with_any_username() {
        assert!(password_matches(Some(&basic("admin", "s3cret")), "s3cret"));
        assert!(password_matches(Some(&basic("anyone", "s3cret")), "s3cret"));
    }

    #[test]
    fn rejects_wrong_or_missing_credentials() {
        assert!(!password_matches(None, "s3cret"));
        assert!(!password_matches(Some("Bearer token"), "s3cret"));
        assert!(!password_matches(Some("Basic !!!notbase64"), "s3cret"));
        assert!(!password_matches(Some(&basic("admin", "wrong")), "s3cret"));
        assert!(!password_matches(Some(&basic("admin", "")), "s3cret"));
    }
}
