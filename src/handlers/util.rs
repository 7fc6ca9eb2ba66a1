//! Shared utilities for handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use tracing::debug;

/// Pull one optional field out of a JSON body.
///
/// An unreadable body (wrong content type, malformed JSON, wrong field
/// type) is treated the same as a missing field so the caller answers with
/// its usual 400 message.
pub fn body_field<T, F>(payload: Result<Json<T>, JsonRejection>, pick: F) -> Option<String>
where
    F: FnOnce(T) -> Option<String>,
{
    match payload {
        Ok(Json(body)) => pick(body),
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable request body");
            None
        }
    }
}
