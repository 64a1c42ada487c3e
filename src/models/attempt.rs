use serde::Serialize;
use sqlx::FromRow;

/// One row of a user's answer history, joined with quiz and video context.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptResponse {
    pub id: i64,
    pub quiz_id: i64,
    pub video_id: i64,
    pub video_title: String,
    pub question: String,
    pub is_correct: bool,
    pub xp_earned: i64,
    pub answered_at: chrono::DateTime<chrono::Utc>,
}
