pub mod leaderboard;
pub mod models;
pub mod ranking;
pub mod recurrence;
pub mod scoring;
