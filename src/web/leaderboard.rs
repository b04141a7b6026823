use crate::domain::models::LeaderboardEntry;
use crate::services::standings::{NewCheckIn, RecordedCheckIn};
use crate::state::SharedState;
use crate::web::error_status;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    user_id: String,
    total_score: f64,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/:id/leaderboard", get(get_leaderboard))
        .route("/:id/checkins", post(create_checkin))
        .route("/:id/participants/:user_id/rescore", post(rescore_participant))
        .with_state(state)
}

async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(challenge_id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, StatusCode> {
    state
        .standings
        .leaderboard(&challenge_id, query.limit)
        .await
        .map(Json)
        .map_err(|e| error_status(&e))
}

async fn create_checkin(
    State(state): State<SharedState>,
    Path(challenge_id): Path<String>,
    Json(payload): Json<NewCheckIn>,
) -> Result<(StatusCode, Json<RecordedCheckIn>), StatusCode> {
    if payload.user_id.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let recorded = state
        .standings
        .record_checkin(&challenge_id, payload)
        .await
        .map_err(|e| error_status(&e))?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

async fn rescore_participant(
    State(state): State<SharedState>,
    Path((challenge_id, user_id)): Path<(String, String)>,
) -> Result<Json<ScoreResponse>, StatusCode> {
    let total_score = state
        .standings
        .refresh_enrollment(&challenge_id, &user_id)
        .await
        .map_err(|e| error_status(&e))?;
    Ok(Json(ScoreResponse { user_id, total_score }))
}
