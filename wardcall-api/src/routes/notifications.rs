use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::app_state::AppState;
use crate::domain::{DispatchRequest, DispatchSummary};

use super::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/dispatch", post(dispatch))
}

#[instrument(name = "dispatch_notification", skip(app_state, body))]
async fn dispatch(
    State(app_state): State<AppState>,
    Json(body): Json<DispatchRequest>,
) -> Result<Json<DispatchSummary>, ApiError> {
    let (target, payload) = body.into_parts()?;
    let summary = app_state.dispatcher.dispatch(&target, &payload).await?;

    Ok(Json(summary))
}
