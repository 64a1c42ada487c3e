// src/handlers/ranking.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config,
    error::AppError,
    models::ranking::{RankingEntry, RankingParams},
    scoring,
};

#[derive(sqlx::FromRow)]
struct RankingRow {
    id: i64,
    name: String,
    xp: i64,
}

/// Assigns dense, 1-based, offset-aware positions to an already-sorted page.
fn with_positions(offset: i64, rows: Vec<RankingRow>) -> Vec<RankingEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| RankingEntry {
            position: offset + index as i64 + 1,
            id: row.id,
            name: row.name,
            level: scoring::level_from_xp(row.xp),
            xp: row.xp,
        })
        .collect()
}

/// The global leaderboard.
///
/// Ordering is total and deterministic: XP descending, then registration
/// time ascending (the earlier account wins a tie), then id as the final
/// key. Every call recomputes positions from the live XP column; nothing is
/// cached or persisted, so a pagination sequence is restartable at any time.
///
/// `limit` is clamped into 1..=100 (default 20); a negative or zero limit
/// clamps to 1 rather than erroring. Negative `offset` clamps to 0.
pub async fn get_ranking(
    State(pool): State<PgPool>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(config::DEFAULT_RANKING_LIMIT)
        .clamp(1, config::MAX_RANKING_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = sqlx::query_as::<_, RankingRow>(
        r#"
        SELECT id, name, xp
        FROM users
        ORDER BY xp DESC, created_at ASC, id ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(with_positions(offset, rows)))
}
