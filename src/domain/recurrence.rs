use crate::domain::models::{Habit, HabitFrequency};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Base rule deciding which calendar days a habit falls on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    Weekly { days: Vec<Weekday> },
    Interval { every_days: u32, anchor: NaiveDate },
    Monthly { days: BTreeSet<u32> },
    /// Malformed or inactive rules land here.
    Never,
}

impl Recurrence {
    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut unique: Vec<Weekday> = Vec::new();
        for day in days {
            if !unique.contains(&day) {
                unique.push(day);
            }
        }
        if unique.is_empty() {
            Recurrence::Never
        } else {
            Recurrence::Weekly { days: unique }
        }
    }

    pub fn interval(every_days: u32, anchor: NaiveDate) -> Self {
        if every_days == 0 {
            Recurrence::Never
        } else {
            Recurrence::Interval { every_days, anchor }
        }
    }

    pub fn monthly(days: impl IntoIterator<Item = u32>) -> Self {
        let days: BTreeSet<u32> = days.into_iter().filter(|d| (1..=31).contains(d)).collect();
        if days.is_empty() {
            Recurrence::Never
        } else {
            Recurrence::Monthly { days }
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Recurrence::Daily => true,
            Recurrence::Weekly { days } => days.contains(&date.weekday()),
            Recurrence::Interval { every_days, anchor } => {
                let since = (date - *anchor).num_days();
                since.rem_euclid(i64::from(*every_days)) == 0
            }
            // 30 never matches in February: no clamping to month end
            Recurrence::Monthly { days } => days.contains(&date.day()),
            Recurrence::Never => false,
        }
    }
}

/// Days that are never due, whatever the base rule says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exceptions {
    pub weekdays: Vec<Weekday>,
    pub dates: BTreeSet<NaiveDate>,
}

impl Exceptions {
    pub fn excludes(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(&date.weekday()) || self.dates.contains(&date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PatternDocument")]
pub struct HabitPattern {
    pub recurrence: Recurrence,
    pub exceptions: Exceptions,
}

impl HabitPattern {
    pub fn new(recurrence: Recurrence) -> Self {
        Self {
            recurrence,
            exceptions: Exceptions::default(),
        }
    }

    pub fn never() -> Self {
        Self::new(Recurrence::Never)
    }

    pub fn except_weekdays(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        for day in days {
            if !self.exceptions.weekdays.contains(&day) {
                self.exceptions.weekdays.push(day);
            }
        }
        self
    }

    pub fn except_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.exceptions.dates.extend(dates);
        self
    }

    pub fn is_due(&self, date: NaiveDate) -> bool {
        !self.exceptions.excludes(date) && self.recurrence.matches(date)
    }

    /// Lazily walks `[start, end]` yielding due days. Each call starts over.
    pub fn due_dates(&self, start: NaiveDate, end: NaiveDate) -> DueDates<'_> {
        DueDates {
            pattern: self,
            next: if start <= end { Some(start) } else { None },
            end,
        }
    }
}

pub fn is_due(pattern: &HabitPattern, date: NaiveDate) -> bool {
    pattern.is_due(date)
}

/// Due days within `[start, end]`; empty when `start > end`.
pub fn generate_due_dates(pattern: &HabitPattern, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    pattern.due_dates(start, end).collect()
}

#[derive(Debug, Clone)]
pub struct DueDates<'a> {
    pattern: &'a HabitPattern,
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DueDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.next {
            self.next = current.succ_opt().filter(|d| *d <= self.end);
            if self.pattern.is_due(current) {
                return Some(current);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(next) => (0, Some(((self.end - next).num_days() + 1) as usize)),
            None => (0, Some(0)),
        }
    }
}

/// Parses "Monday", "mon", "MON" and similar. Unknown names give `None`.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let lower = raw.trim().to_lowercase();
    let day = match lower.as_str() {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// ISO numbering: 1 is Monday, 7 is Sunday.
pub fn weekday_from_iso(number: u64) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_from_value(value: &serde_json::Value) -> Option<Weekday> {
    match value {
        serde_json::Value::String(s) => parse_weekday(s),
        serde_json::Value::Number(n) => n.as_u64().and_then(weekday_from_iso),
        _ => None,
    }
}

/// Wire shape of a pattern rule:
/// `{ "type": "weekly", "config": { "days": ["Monday"] }, "exceptions": ["Saturday"] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDocument {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl PatternDocument {
    fn days(&self) -> Vec<serde_json::Value> {
        self.config
            .get("days")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default()
    }

    fn recurrence(&self) -> Recurrence {
        match self.kind.trim().to_lowercase().as_str() {
            "daily" => Recurrence::Daily,
            "weekly" | "custom" | "custom-days" | "custom_days" => {
                Recurrence::weekly(self.days().iter().filter_map(weekday_from_value))
            }
            "interval" => {
                let every = self
                    .config
                    .get("interval")
                    .or_else(|| self.config.get("everyDays"))
                    .and_then(|v| v.as_u64())
                    .and_then(|v| u32::try_from(v).ok());
                let anchor = self
                    .config
                    .get("startDate")
                    .or_else(|| self.config.get("anchor"))
                    .and_then(|v| v.as_str())
                    .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
                match (every, anchor) {
                    (Some(every), Some(anchor)) => Recurrence::interval(every, anchor),
                    _ => Recurrence::Never,
                }
            }
            "monthly" => Recurrence::monthly(
                self.days()
                    .iter()
                    .filter_map(|v| v.as_u64())
                    .filter_map(|v| u32::try_from(v).ok()),
            ),
            _ => Recurrence::Never,
        }
    }
}

impl From<PatternDocument> for HabitPattern {
    fn from(doc: PatternDocument) -> Self {
        let mut pattern = HabitPattern::new(doc.recurrence());
        for raw in &doc.exceptions {
            if let Some(day) = parse_weekday(raw) {
                pattern = pattern.except_weekdays([day]);
            } else if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                pattern = pattern.except_dates([date]);
            } else {
                tracing::debug!("Ignoring unrecognised habit exception {:?}", raw);
            }
        }
        pattern
    }
}

impl Habit {
    /// Recurrence for this habit. `anchor` is the challenge start date and
    /// only matters for weekly habits without explicit days.
    pub fn pattern(&self, anchor: NaiveDate) -> HabitPattern {
        if !self.active {
            return HabitPattern::never();
        }

        let custom_days: Vec<Weekday> = self
            .custom_frequency
            .as_ref()
            .map(|c| {
                c.days
                    .iter()
                    .filter_map(|d| weekday_from_iso(u64::from(*d)))
                    .collect()
            })
            .unwrap_or_default();

        let recurrence = match self.frequency {
            HabitFrequency::Daily => Recurrence::Daily,
            HabitFrequency::Custom => Recurrence::weekly(custom_days),
            HabitFrequency::Weekly if !custom_days.is_empty() => Recurrence::weekly(custom_days),
            HabitFrequency::Weekly => Recurrence::interval(7, anchor),
        };
        HabitPattern::new(recurrence)
    }

    /// Due days in `[from, to]`, each carrying the habit's clock times.
    pub fn schedule(&self, from: NaiveDate, to: NaiveDate, anchor: NaiveDate) -> Vec<DueDay> {
        let times = self
            .custom_frequency
            .as_ref()
            .map(|c| c.times.clone())
            .unwrap_or_default();
        self.pattern(anchor)
            .due_dates(from, to)
            .map(|date| DueDay {
                date,
                times: times.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueDay {
    pub date: NaiveDate,
    pub times: Vec<NaiveTime>,
}
