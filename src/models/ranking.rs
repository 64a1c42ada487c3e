// src/models/ranking.rs

use serde::{Deserialize, Serialize};

/// One leaderboard row. Derived per query, never persisted; `position` is
/// dense, 1-based and offset-aware.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RankingEntry {
    pub position: i64,
    pub id: i64,
    pub name: String,
    pub xp: i64,
    pub level: i64,
}

/// Query parameters for the leaderboard.
#[derive(Debug, Deserialize)]
pub struct RankingParams {
    /// Number of entries (default: 20). Values outside `1..=100` are clamped.
    pub limit: Option<i64>,

    /// Number of leading entries to skip (default: 0, negative clamps to 0).
    pub offset: Option<i64>,
}
