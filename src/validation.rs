//! Request field validation for the tool endpoints.
//!
//! Voice platforms forward whatever the speech model produced. A field is
//! only rejected when it is absent or blank; anything else is trimmed and
//! passed on to the provider as spoken.

use crate::error::{AppError, AppResult};

pub const MISSING_QUERY_MESSAGE: &str = "Please provide a search query";
pub const MISSING_LOCATION_MESSAGE: &str = "Please provide a location";

/// Require a non-blank text field, returning it trimmed.
///
/// `missing_message` is returned verbatim for absent or blank values.
pub fn require_text(value: Option<String>, missing_message: &str) -> AppResult<String> {
    let value = value.as_deref().map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(AppError::Validation(missing_message.to_string()));
    }

    Ok(value.to_string())
}

pub fn require_query(value: Option<String>) -> AppResult<String> {
    require_text(value, MISSING_QUERY_MESSAGE)
}

pub fn require_location(value: Option<String>) -> AppResult<String> {
    require_text(value, MISSING_LOCATION_MESSAGE)
}
