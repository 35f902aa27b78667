use tracing::{error, info};

use crate::error::ApiError;
use crate::models::{NewEntry, SignupRequest};
use crate::store::{StoreError, WaitlistStore};
use crate::validate;

// trim, and turn empty/whitespace-only optionals into None so the store
// keeps NULL rather than an empty string
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Validate, normalize and persist one signup. Insert is the only mutating
// step: zero rows are written on any failure path. Duplicate detection is
// left entirely to the store's unique constraint so concurrent submissions
// of the same email cannot both succeed.
pub async fn submit(store: &dyn WaitlistStore, request: SignupRequest) -> Result<(), ApiError> {
    let name = request.name.unwrap_or_default();
    let email = request.email.unwrap_or_default();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::MissingField);
    }

    if !validate::valid_name(&name) {
        return Err(ApiError::InvalidField {
            field: "name",
            reason: "Name must be between 1 and 100 characters.".to_string(),
        });
    }
    if !validate::valid_email(&email) {
        return Err(ApiError::InvalidField {
            field: "email",
            reason: "Invalid email format.".to_string(),
        });
    }
    if !validate::valid_school(request.school.as_deref()) {
        return Err(ApiError::InvalidField {
            field: "school",
            reason: "Location must be 200 characters or less.".to_string(),
        });
    }
    if !validate::valid_source(request.source.as_deref()) {
        return Err(ApiError::InvalidField {
            field: "source",
            reason: "Source must be 100 characters or less.".to_string(),
        });
    }

    let entry = NewEntry {
        name: name.trim().to_string(),
        email: email.trim().to_lowercase(),
        school: normalize_optional(request.school),
        source: normalize_optional(request.source),
    };

    match store.insert(&entry).await {
        Ok(()) => {
            info!(source = entry.source.as_deref().unwrap_or("direct"), "waitlist signup accepted");
            Ok(())
        }
        Err(StoreError::Duplicate) => Err(ApiError::DuplicateEmail),
        Err(StoreError::Unavailable(detail)) => {
            error!(detail, "waitlist insert failed");
            Err(ApiError::StoreUnavailable)
        }
    }
}
