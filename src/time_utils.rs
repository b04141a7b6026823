use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

/// Where a challenge's calendar days start and end: an IANA zone, or a
/// fixed offset written as `UTC+02:00`, `GMT-5`, `UTC+0530`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChallengeZone {
    Named(Tz),
    Offset(FixedOffset),
}

impl ChallengeZone {
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            ChallengeZone::Named(tz) => instant.with_timezone(tz).date_naive(),
            ChallengeZone::Offset(offset) => instant.with_timezone(offset).date_naive(),
        }
    }
}

impl FromStr for ChallengeZone {
    type Err = UnknownTimezone;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        let unknown = || UnknownTimezone(raw.to_string());

        let prefix = name.get(..3).map(str::to_ascii_uppercase);
        if let Some("UTC" | "GMT") = prefix.as_deref() {
            let rest = &name[3..];
            if rest.is_empty() {
                return Ok(ChallengeZone::Offset(FixedOffset::east_opt(0).ok_or_else(unknown)?));
            }
            if let Some(offset) = signed_offset(rest) {
                return Ok(ChallengeZone::Offset(offset));
            }
        }

        name.parse::<Tz>().map(ChallengeZone::Named).map_err(|_| unknown())
    }
}

/// `+H`, `+HH`, `+HHMM` or `+HH:MM`, at most 14 hours either way.
fn signed_offset(raw: &str) -> Option<FixedOffset> {
    let sign = match raw.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = &raw[1..];
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    if hours.is_empty() || !hours.chars().chain(minutes.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Spelling to store for a timezone setting, or `None` when it cannot be
/// resolved. Bare `utc`/`gmt` become `UTC`; everything else keeps its form.
pub fn normalize_timezone(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.eq_ignore_ascii_case("utc") || name.eq_ignore_ascii_case("gmt") {
        return Some("UTC".to_string());
    }
    name.parse::<ChallengeZone>().ok().map(|_| name.to_string())
}

/// Calendar day of `instant` in `tz`. Unknown timezones fall back to the
/// UTC day.
pub fn local_date(tz: &str, instant: DateTime<Utc>) -> NaiveDate {
    match tz.parse::<ChallengeZone>() {
        Ok(zone) => zone.day_of(instant),
        Err(e) => {
            tracing::debug!("{}, using the UTC day", e);
            instant.date_naive()
        }
    }
}
