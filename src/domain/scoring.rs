use crate::domain::models::{sanitize_points, CheckIn, Enrollment};

/// Total points for a set of check-ins. Empty input scores 0.
///
/// Values are summed smallest-first so the floating point result does not
/// depend on the order the check-ins were fetched in.
pub fn aggregate_score(checkins: &[CheckIn]) -> f64 {
    let mut points: Vec<f64> = checkins
        .iter()
        .map(|c| sanitize_points(c.auto_score))
        .collect();
    points.sort_by(f64::total_cmp);
    points.into_iter().sum()
}

/// Check-ins belonging to one enrollment.
pub fn checkins_for<'a>(
    checkins: &'a [CheckIn],
    challenge_id: &str,
    user_id: &str,
) -> Vec<&'a CheckIn> {
    checkins
        .iter()
        .filter(|c| c.challenge_id == challenge_id && c.user_id == user_id)
        .collect()
}

/// Recomputes the cached total of `enrollment` from its own check-ins.
/// Check-ins of other enrollments in `checkins` are ignored.
pub fn rescore(mut enrollment: Enrollment, checkins: &[CheckIn]) -> Enrollment {
    let own: Vec<CheckIn> = checkins_for(checkins, &enrollment.challenge_id, &enrollment.user_id)
        .into_iter()
        .cloned()
        .collect();
    enrollment.total_score = aggregate_score(&own);
    enrollment
}
