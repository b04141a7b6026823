use serde::{Deserialize, Serialize};

/// How equal scores are numbered.
///
/// `Sequential` hands out distinct ranks 1..=n with ties ordered by input
/// position. `Competition` gives tied entries the same rank and skips the
/// following numbers (1, 1, 3). Ordering is the same in both modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    #[default]
    Sequential,
    Competition,
}

impl RankingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMode::Sequential => "sequential",
            RankingMode::Competition => "competition",
        }
    }
}

impl TryFrom<&str> for RankingMode {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "sequential" | "dense" | "index" => Ok(RankingMode::Sequential),
            "competition" | "standard" | "shared" => Ok(RankingMode::Competition),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedEntry {
    pub id: String,
    pub score: f64,
    pub rank: u32,
}

fn rank_key(score: f64) -> f64 {
    // NaN and -0.0 both sort as plain zero
    if score.is_nan() || score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Sorts `items` by descending score (stable) and pairs each with its rank.
pub fn rank_by_score<T, F>(items: Vec<T>, score: F, mode: RankingMode) -> Vec<(u32, T)>
where
    F: Fn(&T) -> f64,
{
    let mut keyed: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (rank_key(score(&item)), item))
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut ranked = Vec::with_capacity(keyed.len());
    let mut previous: Option<(f64, u32)> = None;
    for (idx, (key, item)) in keyed.into_iter().enumerate() {
        let position = idx as u32 + 1;
        let rank = match (mode, previous) {
            (RankingMode::Competition, Some((prev_key, prev_rank))) if prev_key == key => prev_rank,
            _ => position,
        };
        previous = Some((key, rank));
        ranked.push((rank, item));
    }
    ranked
}

/// Ranks entries highest score first. Ties keep their input order and get
/// distinct consecutive ranks.
pub fn assign_ranks(entries: Vec<ScoreEntry>) -> Vec<RankedEntry> {
    assign_ranks_with(entries, RankingMode::Sequential)
}

pub fn assign_ranks_with(entries: Vec<ScoreEntry>, mode: RankingMode) -> Vec<RankedEntry> {
    rank_by_score(entries, |e| e.score, mode)
        .into_iter()
        .map(|(rank, e)| RankedEntry {
            id: e.id,
            score: e.score,
            rank,
        })
        .collect()
}
