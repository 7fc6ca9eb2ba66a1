//! `POST /search` - web search read aloud.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::instrument;

use super::util::body_field;
use crate::error::{AppError, AppResult};
use crate::models::{SearchRequest, ToolResponse};
use crate::state::AppState;
use crate::validation::require_query;

const SEARCH_FAILED_MESSAGE: &str = "Sorry, I had trouble searching for that information.";

/// Search endpoint.
///
/// # Request Body
///
/// ```json
/// { "query": "rust programming language" }
/// ```
///
/// # Response Body
///
/// ```json
/// { "success": true, "results": "Here's what I found: ..." }
/// ```
#[instrument(skip(state, payload))]
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> AppResult<Json<ToolResponse>> {
    let query = require_query(body_field(payload, |body| body.query))?;

    let spoken = state
        .search
        .search(&query)
        .await
        .map_err(|e| AppError::upstream(e, SEARCH_FAILED_MESSAGE))?;

    Ok(Json(ToolResponse::spoken(spoken)))
}
