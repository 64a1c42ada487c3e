// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config,
    error::AppError,
    models::quiz::{AnswerRequest, CreateQuizRequest, PublicQuiz, Quiz},
    scoring,
    utils::jwt::Claims,
};

/// Attaches a quiz to an existing video.
///
/// Restricted to teacher and admin accounts. A video can hold exactly one
/// quiz; the database UNIQUE constraint turns the second attempt into a 409
/// no matter how the requests race.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "teacher" && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "Only teachers can create quizzes".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let video = sqlx::query_scalar::<_, i64>("SELECT id FROM videos WHERE id = $1")
        .bind(payload.video_id)
        .fetch_optional(&pool)
        .await?;

    if video.is_none() {
        return Err(AppError::NotFound("Video not found".to_string()));
    }

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (video_id, question, options, correct_answer, xp_reward)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, video_id, question, options, correct_answer, xp_reward, created_at
        "#,
    )
    .bind(payload.video_id)
    .bind(&payload.quiz.question)
    .bind(SqlJson(&payload.quiz.options))
    .bind(payload.quiz.correct_answer)
    .bind(payload.quiz.xp_reward.unwrap_or(config::DEFAULT_XP_REWARD))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            AppError::Conflict("This video already has a quiz".to_string())
        } else {
            tracing::error!("Failed to create quiz: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(PublicQuiz::from(quiz))))
}

/// Fetches the quiz for a video, correct answer withheld.
pub async fn get_quiz_for_video(
    State(pool): State<PgPool>,
    Path(video_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, video_id, question, options, correct_answer, xp_reward, created_at
        FROM quizzes
        WHERE video_id = $1
        "#,
    )
    .bind(video_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(quiz)))
}

/// Submits an answer to a quiz and returns the graded outcome.
///
/// An incorrect answer is still a 200: the caller learns `is_correct` and
/// `xp_earned`, and the attempt is on record either way.
pub async fn submit_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

    let outcome = scoring::submit_answer(&pool, user_id, quiz_id, payload.answer_index).await?;

    Ok(Json(outcome))
}
