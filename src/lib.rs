//! Scoring, leaderboard and habit scheduling for fitness challenges.
//!
//! The `domain` module is pure: it works on already-fetched records and never
//! performs I/O. Everything that talks to storage goes through
//! [`db::ChallengeRepository`].

pub mod config;
pub mod db;
pub mod domain;
pub mod services;
pub mod state;
pub mod time_utils;
pub mod web;
