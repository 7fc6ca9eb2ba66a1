//! `POST /time` - local time anywhere in the world.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use super::util::body_field;
use crate::error::{AppError, AppResult};
use crate::models::{LocationRequest, ToolResponse};
use crate::state::AppState;
use crate::validation::require_location;

/// World clock endpoint.
///
/// Returns 404 when the location matches neither a known city nor any
/// timezone identifier.
#[instrument(skip(state, payload))]
pub async fn world_clock(
    State(state): State<AppState>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> AppResult<Json<ToolResponse>> {
    let location = require_location(body_field(payload, |body| body.location))?;

    let spoken = state.time.describe(&location).ok_or_else(|| {
        AppError::NotFound(format!(
            "I couldn't find a timezone for {location}. Try a major city name instead."
        ))
    })?;

    Ok(Json(ToolResponse::spoken(spoken)))
}
