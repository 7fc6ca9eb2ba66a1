//! `POST /weather` - current conditions read aloud.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use super::util::body_field;
use crate::error::{AppError, AppResult};
use crate::models::{LocationRequest, ToolResponse};
use crate::state::AppState;
use crate::validation::require_location;

const WEATHER_FAILED_MESSAGE: &str = "Sorry, I had trouble getting the weather information.";

/// Weather endpoint.
///
/// # Request Body
///
/// ```json
/// { "location": "London" }
/// ```
#[instrument(skip(state, payload))]
pub async fn weather(
    State(state): State<AppState>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> AppResult<Json<ToolResponse>> {
    let location = require_location(body_field(payload, |body| body.location))?;

    let spoken = state
        .weather
        .current(&location)
        .await
        .map_err(|e| AppError::upstream(e, WEATHER_FAILED_MESSAGE))?;

    Ok(Json(ToolResponse::spoken(spoken)))
}
