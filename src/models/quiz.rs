// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config;

/// Represents the 'quizzes' table in the database.
/// Immutable after creation; exactly one per video.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// Owning video. UNIQUE in the database: one quiz per video.
    pub video_id: i64,

    pub question: String,

    /// Ordered answer options, always `config::QUIZ_OPTION_COUNT` of them.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Zero-based index of the correct option.
    pub correct_answer: i32,

    /// XP awarded for a correct answer.
    pub xp_reward: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a quiz to clients: the correct answer is withheld.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub video_id: i64,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub xp_reward: i64,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            video_id: quiz.video_id,
            question: quiz.question,
            options: quiz.options,
            xp_reward: quiz.xp_reward,
        }
    }
}

/// Quiz content as submitted by a teacher, either standalone or embedded in
/// a video upload.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_quiz_payload))]
pub struct QuizPayload {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Question length must be between 1 and 500 characters."
    ))]
    pub question: String,

    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    /// Zero-based index into `options`.
    pub correct_answer: i32,

    /// Defaults to `config::DEFAULT_XP_REWARD` when omitted.
    #[validate(range(min = 1, message = "XP reward must be positive."))]
    pub xp_reward: Option<i64>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != config::QUIZ_OPTION_COUNT {
        return Err(validator::ValidationError::new("options_count"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 300 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

/// Cross-field rule: the correct-answer index must point at an option.
fn validate_quiz_payload(quiz: &QuizPayload) -> Result<(), validator::ValidationError> {
    if quiz.correct_answer < 0 || quiz.correct_answer as usize >= config::QUIZ_OPTION_COUNT {
        return Err(validator::ValidationError::new("correct_answer_out_of_range"));
    }
    Ok(())
}

/// DTO for creating a standalone quiz for an existing video.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub video_id: i64,

    #[serde(flatten)]
    #[validate(nested)]
    pub quiz: QuizPayload,
}

/// DTO for submitting an answer. Any integer is accepted; values that do not
/// match the correct index (including out-of-range ones) grade as incorrect.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer_index: i64,
}

/// Outcome of one answer submission. An incorrect answer is a normal,
/// successful outcome, not an error.
#[derive(Debug, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub xp_earned: i64,
    pub attempt_id: i64,
}
