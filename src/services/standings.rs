use crate::db::{ChallengeRepository, RepoError};
use crate::domain::leaderboard::build_leaderboard;
use crate::domain::models::{lenient_points, sanitize_points, CheckIn, LeaderboardEntry};
use crate::domain::ranking::RankingMode;
use crate::domain::recurrence::DueDay;
use crate::time_utils;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum StandingsError {
    #[error("challenge {0} not found")]
    ChallengeNotFound(String),
    #[error("habit {0} not found")]
    HabitNotFound(String),
    #[error("user {user_id} is not enrolled in {challenge_id}")]
    NotEnrolled { challenge_id: String, user_id: String },
    #[error("{date} is outside challenge {challenge_id}")]
    OutsideChallenge { challenge_id: String, date: NaiveDate },
    #[error("user {user_id} already checked in on {date}")]
    AlreadyCheckedIn { user_id: String, date: NaiveDate },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCheckIn {
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient_points")]
    pub auto_score: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCheckIn {
    pub checkin: CheckIn,
    pub total_score: f64,
}

/// Keeps enrollment totals in step with check-ins and serves the derived
/// views (leaderboards, habit schedules) from repository data.
#[derive(Clone)]
pub struct StandingsService {
    repo: Arc<dyn ChallengeRepository>,
    ranking_mode: RankingMode,
    default_timezone: String,
}

impl StandingsService {
    pub fn new(repo: Arc<dyn ChallengeRepository>, ranking_mode: RankingMode, default_timezone: String) -> Self {
        Self {
            repo,
            ranking_mode,
            default_timezone,
        }
    }

    pub async fn record_checkin(
        &self,
        challenge_id: &str,
        new: NewCheckIn,
    ) -> Result<RecordedCheckIn, StandingsError> {
        let challenge = self
            .repo
            .challenge(challenge_id)
            .await?
            .ok_or_else(|| StandingsError::ChallengeNotFound(challenge_id.to_string()))?;

        if self.repo.enrollment(challenge_id, &new.user_id).await?.is_none() {
            tracing::warn!("Rejected check-in: {} is not enrolled in {}", new.user_id, challenge_id);
            return Err(StandingsError::NotEnrolled {
                challenge_id: challenge_id.to_string(),
                user_id: new.user_id,
            });
        }

        let date = new.date.unwrap_or_else(|| {
            let tz = challenge.timezone.as_deref().unwrap_or(&self.default_timezone);
            time_utils::local_date(tz, Utc::now())
        });
        if !challenge.contains(date) {
            tracing::warn!("Rejected check-in for {} on {}: outside challenge window", new.user_id, date);
            return Err(StandingsError::OutsideChallenge {
                challenge_id: challenge_id.to_string(),
                date,
            });
        }

        let checkin = CheckIn {
            id: Uuid::new_v4().to_string(),
            challenge_id: challenge_id.to_string(),
            user_id: new.user_id.clone(),
            date,
            auto_score: sanitize_points(new.auto_score),
        };

        let total_score = match self.repo.insert_checkin_and_rescore(checkin.clone()).await {
            Ok(total) => total,
            Err(RepoError::Conflict(reason)) => {
                tracing::warn!("Rejected check-in: {}", reason);
                return Err(StandingsError::AlreadyCheckedIn {
                    user_id: new.user_id,
                    date,
                });
            }
            Err(RepoError::NotFound(_)) => {
                return Err(StandingsError::NotEnrolled {
                    challenge_id: challenge_id.to_string(),
                    user_id: new.user_id,
                });
            }
        };
        tracing::info!(
            "Recorded check-in {} for {} in {} ({} pts, total {})",
            checkin.id,
            checkin.user_id,
            challenge_id,
            checkin.auto_score,
            total_score
        );

        Ok(RecordedCheckIn { checkin, total_score })
    }

    /// Re-aggregates one enrollment from its check-ins and stores the result.
    pub async fn refresh_enrollment(&self, challenge_id: &str, user_id: &str) -> Result<f64, StandingsError> {
        let change = self
            .repo
            .rescore_enrollment(challenge_id, user_id)
            .await
            .map_err(|e| match e {
                RepoError::NotFound(_) => StandingsError::NotEnrolled {
                    challenge_id: challenge_id.to_string(),
                    user_id: user_id.to_string(),
                },
                other => other.into(),
            })?;
        tracing::debug!("Refreshed {}/{}: {} -> {}", challenge_id, user_id, change.previous, change.total);
        Ok(change.total)
    }

    pub async fn leaderboard(
        &self,
        challenge_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, StandingsError> {
        if self.repo.challenge(challenge_id).await?.is_none() {
            return Err(StandingsError::ChallengeNotFound(challenge_id.to_string()));
        }

        let enrollments = self.repo.enrollments_for_challenge(challenge_id).await?;
        let checkins = self.repo.checkins_for_challenge(challenge_id).await?;
        let user_ids: Vec<String> = enrollments.iter().map(|e| e.user_id.clone()).collect();
        let names = self.repo.display_names(&user_ids).await?;

        let mut board = build_leaderboard(&enrollments, &checkins, &names, self.ranking_mode);
        if let Some(limit) = limit {
            board.truncate(limit);
        }
        tracing::debug!("Leaderboard for {}: {} rows", challenge_id, board.len());
        Ok(board)
    }

    /// Due days of a habit with their clock times; weekly habits without
    /// fixed days are anchored to the start of their challenge.
    pub async fn habit_schedule(
        &self,
        habit_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DueDay>, StandingsError> {
        let habit = self
            .repo
            .habit(habit_id)
            .await?
            .ok_or_else(|| StandingsError::HabitNotFound(habit_id.to_string()))?;
        let challenge = self
            .repo
            .challenge(&habit.challenge_id)
            .await?
            .ok_or_else(|| StandingsError::ChallengeNotFound(habit.challenge_id.clone()))?;

        Ok(habit.schedule(from, to, challenge.start_date))
    }

    /// Re-aggregates every enrollment. Returns how many stored totals were
    /// wrong; running it again straight away returns 0.
    pub async fn reconcile_all(&self) -> Result<usize, StandingsError> {
        let enrollments = self.repo.all_enrollments().await?;
        let mut corrected = 0;
        for enrollment in &enrollments {
            let change = self
                .repo
                .rescore_enrollment(&enrollment.challenge_id, &enrollment.user_id)
                .await?;
            if change.changed() {
                tracing::info!(
                    "Corrected total for {}/{}: {} -> {}",
                    enrollment.challenge_id,
                    enrollment.user_id,
                    change.previous,
                    change.total
                );
                corrected += 1;
            }
        }
        tracing::info!("Reconciled {} enrollments, {} corrected", enrollments.len(), corrected);
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::domain::models::{Challenge, CustomFrequency, Enrollment, Habit, HabitFrequency, Participant};
    use chrono::NaiveTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup(mode: RankingMode) -> (InMemoryStore, StandingsService) {
        let store = InMemoryStore::new();
        store
            .put_challenge(Challenge {
                id: "c1".into(),
                name: "January Steps".into(),
                start_date: ymd(2024, 1, 1),
                end_date: ymd(2024, 1, 31),
                timezone: Some("UTC".into()),
            })
            .await;
        for user in ["p1", "p2"] {
            store.put_enrollment(Enrollment::new("c1", user)).await;
        }
        store
            .put_participant(Participant {
                id: "p1".into(),
                display_name: Some("Jordan".into()),
            })
            .await;
        let service = StandingsService::new(Arc::new(store.clone()), mode, "UTC".into());
        (store, service)
    }

    fn new_checkin(user: &str, score: f64, date: NaiveDate) -> NewCheckIn {
        NewCheckIn {
            user_id: user.into(),
            auto_score: score,
            date: Some(date),
        }
    }

    #[tokio::test]
    async fn test_record_checkins_and_rank() {
        let (store, service) = setup(RankingMode::Sequential).await;

        for (day, score) in [(1, 10.0), (2, 15.0), (3, 5.0)] {
            service
                .record_checkin("c1", new_checkin("p1", score, ymd(2024, 1, day)))
                .await
                .unwrap();
        }
        let last = service
            .record_checkin("c1", new_checkin("p2", 20.0, ymd(2024, 1, 1)))
            .await
            .unwrap();
        assert_eq!(last.total_score, 20.0);
        assert!(!last.checkin.id.is_empty());

        let p1 = store.enrollment("c1", "p1").await.unwrap().unwrap();
        assert_eq!(p1.total_score, 30.0);

        let board = service.leaderboard("c1", None).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!((board[0].user_id.as_str(), board[0].rank, board[0].total_score), ("p1", 1, 30.0));
        assert_eq!(board[0].display_name, "Jordan");
        assert_eq!((board[1].user_id.as_str(), board[1].rank, board[1].total_score), ("p2", 2, 20.0));

        let top = service.leaderboard("c1", Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_record_checkin_rejections() {
        let (_store, service) = setup(RankingMode::Sequential).await;

        assert_eq!(
            service.record_checkin("nope", new_checkin("p1", 1.0, ymd(2024, 1, 2))).await,
            Err(StandingsError::ChallengeNotFound("nope".into()))
        );
        assert!(matches!(
            service.record_checkin("c1", new_checkin("stranger", 1.0, ymd(2024, 1, 2))).await,
            Err(StandingsError::NotEnrolled { .. })
        ));
        assert!(matches!(
            service.record_checkin("c1", new_checkin("p1", 1.0, ymd(2024, 2, 1))).await,
            Err(StandingsError::OutsideChallenge { .. })
        ));

        service
            .record_checkin("c1", new_checkin("p1", 4.0, ymd(2024, 1, 2)))
            .await
            .unwrap();
        assert_eq!(
            service.record_checkin("c1", new_checkin("p1", 9.0, ymd(2024, 1, 2))).await,
            Err(StandingsError::AlreadyCheckedIn {
                user_id: "p1".into(),
                date: ymd(2024, 1, 2)
            })
        );
    }

    #[tokio::test]
    async fn test_negative_score_is_stored_as_zero() {
        let (_store, service) = setup(RankingMode::Sequential).await;
        let recorded = service
            .record_checkin("c1", new_checkin("p1", -7.0, ymd(2024, 1, 5)))
            .await
            .unwrap();
        assert_eq!(recorded.checkin.auto_score, 0.0);
        assert_eq!(recorded.total_score, 0.0);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (store, service) = setup(RankingMode::Sequential).await;
        service
            .record_checkin("c1", new_checkin("p1", 12.0, ymd(2024, 1, 3)))
            .await
            .unwrap();

        let mut drifted = store.enrollment("c1", "p1").await.unwrap().unwrap();
        drifted.total_score = 999.0;
        store.put_enrollment(drifted).await;
        let mut phantom = Enrollment::new("c1", "p2");
        phantom.total_score = 5.0;
        store.put_enrollment(phantom).await;

        assert_eq!(service.reconcile_all().await.unwrap(), 2);
        assert_eq!(service.reconcile_all().await.unwrap(), 0);
        assert_eq!(store.enrollment("c1", "p1").await.unwrap().unwrap().total_score, 12.0);
        assert_eq!(store.enrollment("c1", "p2").await.unwrap().unwrap().total_score, 0.0);

        assert_eq!(service.refresh_enrollment("c1", "p1").await.unwrap(), 12.0);
        assert_eq!(service.refresh_enrollment("c1", "p1").await.unwrap(), 12.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkins_do_not_lose_points() {
        let (store, service) = setup(RankingMode::Sequential).await;

        let mut handles = Vec::new();
        for day in 1..=20u32 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .record_checkin("c1", new_checkin("p1", f64::from(day), ymd(2024, 1, day)))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected: f64 = (1..=20u32).map(f64::from).sum();
        assert_eq!(store.enrollment("c1", "p1").await.unwrap().unwrap().total_score, expected);
        assert_eq!(service.reconcile_all().await.unwrap(), 0);
    }

    #[test]
    fn test_new_checkin_lenient_score() {
        let cases = [
            (serde_json::json!({ "userId": "p1", "autoScore": null }), 0.0),
            (serde_json::json!({ "userId": "p1", "autoScore": "12" }), 12.0),
            (serde_json::json!({ "userId": "p1", "autoScore": "twelve" }), 0.0),
            (serde_json::json!({ "userId": "p1" }), 0.0),
        ];
        for (raw, expected) in cases {
            let parsed: NewCheckIn = serde_json::from_value(raw).unwrap();
            assert_eq!(parsed.auto_score, expected);
        }
    }

    #[tokio::test]
    async fn test_competition_mode_from_service() {
        let (_store, service) = setup(RankingMode::Competition).await;
        let board = service.leaderboard("c1", None).await.unwrap();
        assert!(board.iter().all(|e| e.rank == 1));
        assert_eq!(board[0].user_id, "p1");
    }

    #[tokio::test]
    async fn test_habit_schedule() {
        let (store, service) = setup(RankingMode::Sequential).await;
        store
            .put_habit(Habit {
                id: "h1".into(),
                challenge_id: "c1".into(),
                name: "Swim".into(),
                frequency: HabitFrequency::Custom,
                custom_frequency: Some(CustomFrequency {
                    days: vec![1, 3, 5],
                    times: vec![NaiveTime::from_hms_opt(6, 45, 0).unwrap()],
                }),
                active: true,
            })
            .await;

        let schedule = service
            .habit_schedule("h1", ymd(2024, 1, 1), ymd(2024, 1, 7))
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 1), ymd(2024, 1, 3), ymd(2024, 1, 5)]);
        assert!(schedule
            .iter()
            .all(|d| d.times == vec![NaiveTime::from_hms_opt(6, 45, 0).unwrap()]));

        assert_eq!(
            service.habit_schedule("h9", ymd(2024, 1, 1), ymd(2024, 1, 7)).await,
            Err(StandingsError::HabitNotFound("h9".into()))
        );
    }
}
