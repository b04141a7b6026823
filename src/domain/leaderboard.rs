use crate::domain::models::{CheckIn, Enrollment, LeaderboardEntry};
use crate::domain::ranking::{rank_by_score, RankingMode};
use crate::domain::scoring::aggregate_score;
use std::collections::HashMap;

struct Standing<'a> {
    user_id: &'a str,
    total_score: f64,
    checkins_count: usize,
}

/// Builds the ranked leaderboard for one challenge.
///
/// Totals are recomputed from `checkins` rather than read from the cached
/// enrollment totals. Every enrollment gets a row, including participants
/// without check-ins; check-ins of users who are not enrolled are dropped.
/// Ties keep enrollment order.
pub fn build_leaderboard(
    enrollments: &[Enrollment],
    checkins: &[CheckIn],
    names: &HashMap<String, String>,
    mode: RankingMode,
) -> Vec<LeaderboardEntry> {
    let mut by_user: HashMap<(&str, &str), Vec<CheckIn>> = HashMap::new();
    for checkin in checkins {
        by_user
            .entry((checkin.challenge_id.as_str(), checkin.user_id.as_str()))
            .or_default()
            .push(checkin.clone());
    }

    let standings: Vec<Standing<'_>> = enrollments
        .iter()
        .map(|enrollment| {
            let own = by_user
                .get(&(enrollment.challenge_id.as_str(), enrollment.user_id.as_str()))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            Standing {
                user_id: enrollment.user_id.as_str(),
                total_score: aggregate_score(own),
                checkins_count: own.len(),
            }
        })
        .collect();

    rank_by_score(standings, |s| s.total_score, mode)
        .into_iter()
        .map(|(rank, standing)| LeaderboardEntry {
            user_id: standing.user_id.to_string(),
            display_name: names
                .get(standing.user_id)
                .filter(|name| !name.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| standing.user_id.to_string()),
            total_score: standing.total_score,
            checkins_count: standing.checkins_count,
            rank,
        })
        .collect()
}
