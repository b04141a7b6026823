pub mod habits;
pub mod leaderboard;

use crate::services::standings::StandingsError;
use crate::state::SharedState;
use axum::{http::StatusCode, routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/challenges", leaderboard::router(state.clone()))
        .nest("/habits", habits::router(state))
}

pub(crate) fn error_status(err: &StandingsError) -> StatusCode {
    match err {
        StandingsError::ChallengeNotFound(_) | StandingsError::HabitNotFound(_) => StatusCode::NOT_FOUND,
        StandingsError::NotEnrolled { .. } => StatusCode::FORBIDDEN,
        StandingsError::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
        StandingsError::OutsideChallenge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StandingsError::Repo(e) => {
            tracing::error!("Repository failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
