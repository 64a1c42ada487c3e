// src/scoring.rs

use sqlx::PgPool;

use crate::{config, error::AppError, models::quiz::AnswerOutcome};

/// Maps cumulative XP to a level.
///
/// Pure and total: every input has a defined output, levels start at 1 and
/// never decrease as XP grows. Negative input cannot come from the database
/// (xp is CHECK-constrained to be non-negative) but clamps to level 1 anyway.
pub fn level_from_xp(xp: i64) -> i64 {
    xp.max(0) / config::XP_PER_LEVEL + 1
}

/// XP accumulated inside the current level, for progress displays.
pub fn xp_into_level(xp: i64) -> i64 {
    xp.max(0) % config::XP_PER_LEVEL
}

/// Grades a chosen option against a quiz's answer key.
///
/// Any integer is a legal choice: out-of-range and negative indices are just
/// incorrect answers, not validation errors. Returns the correctness flag and
/// the XP earned (the full reward or nothing, no partial credit).
fn grade(correct_answer: i32, xp_reward: i64, answer_index: i64) -> (bool, i64) {
    let is_correct = answer_index == i64::from(correct_answer);
    let xp_earned = if is_correct { xp_reward } else { 0 };
    (is_correct, xp_earned)
}

/// Helper struct for fetching a quiz's answer key.
#[derive(sqlx::FromRow)]
struct QuizKey {
    correct_answer: i32,
    xp_reward: i64,
}

/// Scores one answer submission.
///
/// Loads the quiz, grades the chosen index, and commits the score change and
/// the audit record in one transaction:
/// * correct answer: the user's XP is bumped with a single
///   `UPDATE .. SET xp = xp + $1`, so concurrent submissions for the same
///   user serialize on the row lock and no increment is ever lost;
/// * every submission (correct or not) appends one `answer_attempts` row.
///
/// The caller only ever sees success after the commit, so a reported XP gain
/// is always durable. Resubmitting the same quiz earns the reward again:
/// repeat practice is accounted per attempt, not deduplicated.
pub async fn submit_answer(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
    answer_index: i64,
) -> Result<AnswerOutcome, AppError> {
    let quiz = sqlx::query_as::<_, QuizKey>(
        "SELECT correct_answer, xp_reward FROM quizzes WHERE id = $1",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let (is_correct, xp_earned) = grade(quiz.correct_answer, quiz.xp_reward, answer_index);

    let mut tx = pool.begin().await?;

    if is_correct {
        let new_xp = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET xp = xp + $1 WHERE id = $2 RETURNING xp",
        )
        .bind(xp_earned)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

        let new_level = level_from_xp(new_xp);
        if new_level > level_from_xp(new_xp - xp_earned) {
            tracing::info!("User {} reached level {}", user_id, new_level);
        }
    }

    let attempt_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO answer_attempts (user_id, quiz_id, is_correct, xp_earned)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(is_correct)
    .bind(xp_earned)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_foreign_key_violation())
        {
            // Incorrect answers skip the user lookup, so a stale token for a
            // missing account surfaces here instead.
            AppError::NotFound("User not found".to_string())
        } else {
            tracing::error!("Failed to record answer attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tx.commit().await?;

    Ok(AnswerOutcome {
        is_correct,
        xp_earned,
        attempt_id,
    })
}
