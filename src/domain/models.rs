use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads a point value the way documents actually store it: numbers, numeric
/// strings, `null` or nothing at all. Anything that is not a finite,
/// non-negative number becomes `0.0`.
pub(crate) fn lenient_points<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(sanitize_points(value))
}

pub fn sanitize_points(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    #[serde(default)]
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_points")]
    pub auto_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Free,
    Refunded,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub challenge_id: String,
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient_points")]
    pub total_score: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

impl Enrollment {
    pub fn new(challenge_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            challenge_id: challenge_id.into(),
            user_id: user_id.into(),
            total_score: 0.0,
            payment_status: PaymentStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Challenge {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "RawCustomFrequency")]
pub struct CustomFrequency {
    /// ISO weekday numbers, 1 = Monday through 7 = Sunday.
    pub days: Vec<u8>,
    pub times: Vec<NaiveTime>,
}

#[derive(Deserialize)]
struct RawCustomFrequency {
    #[serde(default)]
    days: Vec<serde_json::Value>,
    #[serde(default)]
    times: Vec<String>,
}

impl From<RawCustomFrequency> for CustomFrequency {
    fn from(raw: RawCustomFrequency) -> Self {
        let mut days: Vec<u8> = raw
            .days
            .iter()
            .filter_map(|v| v.as_u64())
            .filter(|d| (1..=7).contains(d))
            .map(|d| d as u8)
            .collect();
        days.sort_unstable();
        days.dedup();

        let mut times: Vec<NaiveTime> = raw
            .times
            .iter()
            .filter_map(|t| {
                let t = t.trim();
                NaiveTime::parse_from_str(t, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
                    .ok()
            })
            .collect();
        times.sort_unstable();
        times.dedup();

        Self { days, times }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub challenge_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub frequency: HabitFrequency,
    #[serde(default)]
    pub custom_frequency: Option<CustomFrequency>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub total_score: f64,
    pub checkins_count: usize,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkin_missing_score_is_zero() {
        let checkin: CheckIn = serde_json::from_value(json!({
            "challengeId": "c1",
            "userId": "u1",
            "date": "2024-01-03"
        }))
        .unwrap();
        assert_eq!(checkin.auto_score, 0.0);
        assert!(checkin.id.is_empty());
    }

    #[test]
    fn test_checkin_malformed_scores() {
        for (raw, expected) in [
            (json!(null), 0.0),
            (json!("12.5"), 12.5),
            (json!("lots"), 0.0),
            (json!(-4), 0.0),
            (json!(7), 7.0),
            (json!({"points": 3}), 0.0),
        ] {
            let checkin: CheckIn = serde_json::from_value(json!({
                "id": "x",
                "challengeId": "c1",
                "userId": "u1",
                "date": "2024-01-03",
                "autoScore": raw
            }))
            .unwrap();
            assert_eq!(checkin.auto_score, expected);
        }
    }

    #[test]
    fn test_enrollment_defaults() {
        let enrollment: Enrollment = serde_json::from_value(json!({
            "challengeId": "c1",
            "userId": "u1",
            "paymentStatus": "chargeback"
        }))
        .unwrap();
        assert_eq!(enrollment.total_score, 0.0);
        assert_eq!(enrollment.payment_status, PaymentStatus::Unknown);

        let paid: Enrollment = serde_json::from_value(json!({
            "challengeId": "c1",
            "userId": "u2",
            "totalScore": 40,
            "paymentStatus": "paid"
        }))
        .unwrap();
        assert_eq!(paid.total_score, 40.0);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_habit_custom_frequency_normalized() {
        let habit: Habit = serde_json::from_value(json!({
            "id": "h1",
            "challengeId": "c1",
            "frequency": "custom",
            "customFrequency": {
                "days": [5, 1, 9, 0, 1, "tue"],
                "times": ["18:30", "07:00", "late"]
            }
        }))
        .unwrap();
        let custom = habit.custom_frequency.unwrap();
        assert_eq!(custom.days, vec![1, 5]);
        assert_eq!(
            custom.times,
            vec![
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 30, 0).unwrap()
            ]
        );
        assert!(habit.active);
        assert_eq!(habit.frequency, HabitFrequency::Custom);
    }

    #[test]
    fn test_challenge_contains_is_inclusive() {
        let challenge = Challenge {
            id: "c1".into(),
            name: "January".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            timezone: None,
        };
        assert!(challenge.contains(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(challenge.contains(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        assert!(!challenge.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }
}
