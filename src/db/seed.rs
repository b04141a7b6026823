use crate::db::{ChallengeRepository, InMemoryStore};
use crate::domain::models::{Challenge, CheckIn, Enrollment, Habit, Participant};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Export of the hosted document collections, one array per collection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub checkins: Vec<CheckIn>,
    #[serde(default)]
    pub habits: Vec<Habit>,
}

pub async fn load_file(store: &InMemoryStore, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: SeedData = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;
    seed_all(store, seed).await
}

pub async fn seed_all(store: &InMemoryStore, seed: SeedData) -> Result<()> {
    let counts = (
        seed.challenges.len(),
        seed.enrollments.len(),
        seed.checkins.len(),
        seed.habits.len(),
    );

    for challenge in seed.challenges {
        store.put_challenge(challenge).await;
    }
    for participant in seed.participants {
        store.put_participant(participant).await;
    }
    let mut enrolled = Vec::with_capacity(seed.enrollments.len());
    for enrollment in seed.enrollments {
        enrolled.push((enrollment.challenge_id.clone(), enrollment.user_id.clone()));
        store.put_enrollment(enrollment).await;
    }
    for habit in seed.habits {
        store.put_habit(habit).await;
    }

    let mut skipped = 0;
    for checkin in seed.checkins {
        if let Err(e) = store.insert_checkin(checkin).await {
            skipped += 1;
            tracing::warn!("Skipping seeded check-in: {}", e);
        }
    }

    // Exported totals are only a cache; the seeded check-ins decide
    let mut corrected = 0;
    for (challenge_id, user_id) in &enrolled {
        let change = store.rescore_enrollment(challenge_id, user_id).await?;
        if change.changed() {
            corrected += 1;
            tracing::debug!(
                "Seeded total for {}/{}: {} -> {}",
                challenge_id,
                user_id,
                change.previous,
                change.total
            );
        }
    }

    tracing::info!(
        "Seeded {} challenges, {} enrollments, {} check-ins ({} skipped), {} habits",
        counts.0,
        counts.1,
        counts.2 - skipped,
        skipped,
        counts.3
    );
    if corrected > 0 {
        tracing::info!("Re-aggregated {} stale seeded totals", corrected);
    }
    Ok(())
}
