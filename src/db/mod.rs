pub mod seed;

use crate::domain::models::{Challenge, CheckIn, Enrollment, Habit, Participant};
use crate::domain::scoring::rescore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug, PartialEq)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Cached enrollment total before and after re-aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreChange {
    pub previous: f64,
    pub total: f64,
}

impl ScoreChange {
    pub fn changed(&self) -> bool {
        self.previous.to_bits() != self.total.to_bits()
    }
}

/// Read/write access to challenge documents. Scoring and ranking code never
/// sees this; only the services that fetch data for them do.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    async fn challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, RepoError>;

    async fn enrollment(&self, challenge_id: &str, user_id: &str) -> Result<Option<Enrollment>, RepoError>;

    async fn enrollments_for_challenge(&self, challenge_id: &str) -> Result<Vec<Enrollment>, RepoError>;

    async fn all_enrollments(&self) -> Result<Vec<Enrollment>, RepoError>;

    async fn checkins_for_challenge(&self, challenge_id: &str) -> Result<Vec<CheckIn>, RepoError>;

    /// Stores a new check-in. Fails with `Conflict` when the id is taken or
    /// the enrollment already checked in that day.
    async fn insert_checkin(&self, checkin: CheckIn) -> Result<(), RepoError>;

    /// Stores a check-in and re-aggregates its enrollment in one step, so
    /// concurrent check-ins can never leave a stale total behind. Returns
    /// the new total.
    async fn insert_checkin_and_rescore(&self, checkin: CheckIn) -> Result<f64, RepoError>;

    /// Recomputes the cached total of one enrollment from its check-ins.
    async fn rescore_enrollment(&self, challenge_id: &str, user_id: &str) -> Result<ScoreChange, RepoError>;

    /// Display names for the given users; users without one are omitted.
    async fn display_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>, RepoError>;

    async fn habit(&self, habit_id: &str) -> Result<Option<Habit>, RepoError>;
}

#[derive(Default)]
struct Collections {
    challenges: Vec<Challenge>,
    participants: HashMap<String, Participant>,
    enrollments: Vec<Enrollment>,
    checkins: Vec<CheckIn>,
    habits: Vec<Habit>,
}

impl Collections {
    fn enrollment_index(&self, challenge_id: &str, user_id: &str) -> Result<usize, RepoError> {
        self.enrollments
            .iter()
            .position(|e| e.challenge_id == challenge_id && e.user_id == user_id)
            .ok_or_else(|| RepoError::NotFound(format!("enrollment {challenge_id}/{user_id}")))
    }

    fn push_checkin(&mut self, checkin: CheckIn) -> Result<(), RepoError> {
        if !checkin.id.is_empty() && self.checkins.iter().any(|c| c.id == checkin.id) {
            return Err(RepoError::Conflict(format!("check-in {} already exists", checkin.id)));
        }
        if self.checkins.iter().any(|c| {
            c.challenge_id == checkin.challenge_id && c.user_id == checkin.user_id && c.date == checkin.date
        }) {
            return Err(RepoError::Conflict(format!(
                "user {} already checked in to {} on {}",
                checkin.user_id, checkin.challenge_id, checkin.date
            )));
        }
        self.checkins.push(checkin);
        Ok(())
    }

    fn rescore_at(&mut self, idx: usize) -> ScoreChange {
        let previous = self.enrollments[idx].total_score;
        let updated = rescore(self.enrollments[idx].clone(), &self.checkins);
        let total = updated.total_score;
        self.enrollments[idx] = updated;
        ScoreChange { previous, total }
    }
}

/// Process-local document store. Insertion order is kept so that reads
/// return documents the way they were written.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_challenge(&self, challenge: Challenge) {
        let mut data = self.inner.write().await;
        data.challenges.retain(|c| c.id != challenge.id);
        data.challenges.push(challenge);
    }

    pub async fn put_participant(&self, participant: Participant) {
        let mut data = self.inner.write().await;
        data.participants.insert(participant.id.clone(), participant);
    }

    pub async fn put_enrollment(&self, enrollment: Enrollment) {
        let mut data = self.inner.write().await;
        if let Some(existing) = data
            .enrollments
            .iter_mut()
            .find(|e| e.challenge_id == enrollment.challenge_id && e.user_id == enrollment.user_id)
        {
            *existing = enrollment;
        } else {
            data.enrollments.push(enrollment);
        }
    }

    pub async fn put_habit(&self, habit: Habit) {
        let mut data = self.inner.write().await;
        data.habits.retain(|h| h.id != habit.id);
        data.habits.push(habit);
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryStore {
    async fn challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, RepoError> {
        let data = self.inner.read().await;
        Ok(data.challenges.iter().find(|c| c.id == challenge_id).cloned())
    }

    async fn enrollment(&self, challenge_id: &str, user_id: &str) -> Result<Option<Enrollment>, RepoError> {
        let data = self.inner.read().await;
        Ok(data
            .enrollments
            .iter()
            .find(|e| e.challenge_id == challenge_id && e.user_id == user_id)
            .cloned())
    }

    async fn enrollments_for_challenge(&self, challenge_id: &str) -> Result<Vec<Enrollment>, RepoError> {
        let data = self.inner.read().await;
        Ok(data
            .enrollments
            .iter()
            .filter(|e| e.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn all_enrollments(&self) -> Result<Vec<Enrollment>, RepoError> {
        let data = self.inner.read().await;
        Ok(data.enrollments.clone())
    }

    async fn checkins_for_challenge(&self, challenge_id: &str) -> Result<Vec<CheckIn>, RepoError> {
        let data = self.inner.read().await;
        Ok(data
            .checkins
            .iter()
            .filter(|c| c.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn insert_checkin(&self, checkin: CheckIn) -> Result<(), RepoError> {
        let mut data = self.inner.write().await;
        data.push_checkin(checkin)
    }

    async fn insert_checkin_and_rescore(&self, checkin: CheckIn) -> Result<f64, RepoError> {
        let mut data = self.inner.write().await;
        let idx = data.enrollment_index(&checkin.challenge_id, &checkin.user_id)?;
        data.push_checkin(checkin)?;
        Ok(data.rescore_at(idx).total)
    }

    async fn rescore_enrollment(&self, challenge_id: &str, user_id: &str) -> Result<ScoreChange, RepoError> {
        let mut data = self.inner.write().await;
        let idx = data.enrollment_index(challenge_id, user_id)?;
        Ok(data.rescore_at(idx))
    }

    async fn display_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>, RepoError> {
        let data = self.inner.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                data.participants
                    .get(id)
                    .and_then(|p| p.display_name.clone())
                    .map(|name| (id.clone(), name))
            })
            .collect())
    }

    async fn habit(&self, habit_id: &str) -> Result<Option<Habit>, RepoError> {
        let data = self.inner.read().await;
        Ok(data.habits.iter().find(|h| h.id == habit_id).cloned())
    }
}
