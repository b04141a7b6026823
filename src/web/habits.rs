use crate::domain::recurrence::{generate_due_dates, DueDay, HabitPattern};
use crate::state::SharedState;
use crate::web::error_status;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound on the span a single request may expand.
const MAX_RANGE_DAYS: i64 = 3 * 366;

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct EvaluatePayload {
    pattern: HabitPattern,
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Debug, Serialize)]
struct DueDatesResponse {
    dates: Vec<NaiveDate>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/:id/due", get(get_schedule))
        .route("/evaluate", post(evaluate_pattern))
        .with_state(state)
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), StatusCode> {
    if (to - from).num_days() > MAX_RANGE_DAYS {
        tracing::warn!("Rejected due-date range {}..{}", from, to);
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

async fn get_schedule(
    State(state): State<SharedState>,
    Path(habit_id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<DueDay>>, StatusCode> {
    check_range(range.from, range.to)?;
    let schedule = state
        .standings
        .habit_schedule(&habit_id, range.from, range.to)
        .await
        .map_err(|e| error_status(&e))?;
    Ok(Json(schedule))
}

async fn evaluate_pattern(Json(payload): Json<EvaluatePayload>) -> Result<Json<DueDatesResponse>, StatusCode> {
    check_range(payload.from, payload.to)?;
    Ok(Json(DueDatesResponse {
        dates: generate_due_dates(&payload.pattern, payload.from, payload.to),
    }))
}

#[cfg(test)]
mod tests {
    use crate::web::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_habit_schedule() {
        let app = app().await;
        let (status, body) = send(&app, get("/habits/h1/due?from=2024-01-01&to=2024-01-07")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "date": "2024-01-01", "times": ["07:00:00"] },
                { "date": "2024-01-03", "times": ["07:00:00"] },
                { "date": "2024-01-05", "times": ["07:00:00"] }
            ])
        );

        let (status, body) = send(&app, get("/habits/h1/due?from=2024-01-07&to=2024-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(&app, get("/habits/h404/due?from=2024-01-01&to=2024-01-07")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/habits/h1/due?from=2000-01-01&to=2024-01-07")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_evaluate_pattern() {
        let app = app().await;
        let (status, body) = send(
            &app,
            post_json(
                "/habits/evaluate",
                json!({
                    "pattern": {
                        "type": "weekly",
                        "config": { "days": ["Monday", "Wednesday", "Friday"] },
                        "exceptions": ["Friday"]
                    },
                    "from": "2024-01-01",
                    "to": "2024-01-07"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "dates": ["2024-01-01", "2024-01-03"] }));

        let (status, body) = send(
            &app,
            post_json(
                "/habits/evaluate",
                json!({
                    "pattern": { "type": "weekly", "config": { "days": [] } },
                    "from": "2024-01-01",
                    "to": "2024-01-07"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "dates": [] }));
    }
}
