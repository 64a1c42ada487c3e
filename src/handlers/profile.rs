// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    config,
    error::AppError,
    models::attempt::AttemptResponse,
    models::user::{MeResponse, User},
    scoring,
    utils::jwt::Claims,
};

#[derive(sqlx::FromRow)]
struct AttemptStats {
    attempts_count: i64,
    correct_count: i64,
}

/// Returns the authenticated user's profile with leveling progress.
///
/// The level is derived from stored XP on every read, so it can never
/// disagree with the XP total.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, xp, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let stats = sqlx::query_as::<_, AttemptStats>(
        r#"
        SELECT
            COUNT(*) AS attempts_count,
            COUNT(*) FILTER (WHERE is_correct) AS correct_count
        FROM answer_attempts
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        xp: user.xp,
        level: scoring::level_from_xp(user.xp),
        xp_into_level: scoring::xp_into_level(user.xp),
        xp_per_level: config::XP_PER_LEVEL,
        created_at: user.created_at,
        attempts_count: stats.attempts_count,
        correct_count: stats.correct_count,
    }))
}

/// Lists the authenticated user's answer history, newest first.
///
/// Capped at the 50 most recent attempts.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

    let attempts = sqlx::query_as::<_, AttemptResponse>(
        r#"
        SELECT
            a.id,
            a.quiz_id,
            q.video_id,
            v.title AS video_title,
            q.question,
            a.is_correct,
            a.xp_earned,
            a.answered_at
        FROM answer_attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        JOIN videos v ON v.id = q.video_id
        WHERE a.user_id = $1
        ORDER BY a.answered_at DESC, a.id DESC
        LIMIT 50
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}
