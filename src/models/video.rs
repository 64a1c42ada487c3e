use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::models::quiz::{PublicQuiz, QuizPayload};

/// One feed entry: a video with its author and, when one exists, its quiz
/// (public form, correct answer withheld).
#[derive(Debug, Serialize)]
pub struct FeedVideo {
    pub id: i64,
    pub teacher_id: i64,
    pub teacher_name: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub subject: String,
    pub likes_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub quiz: Option<PublicQuiz>,
}

/// DTO for publishing a video, optionally with its quiz in one request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub video_url: String,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub thumbnail_url: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub subject: String,

    #[validate(nested)]
    pub quiz: Option<QuizPayload>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Query parameters for the video feed.
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    /// 1-based page number (default: 1).
    pub page: Option<i64>,

    /// Page size (default: 10, max: 50).
    pub limit: Option<i64>,

    /// Optional exact-match subject filter.
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedVideo>,
    pub pagination: Pagination,
}
