use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config,
    error::AppError,
    models::quiz::PublicQuiz,
    models::video::{CreateVideoRequest, FeedParams, FeedResponse, FeedVideo, Pagination},
    utils::{html::clean_html, jwt::Claims},
};

/// Flat row shape for the feed query; the optional quiz columns come from the
/// LEFT JOIN and are regrouped into `FeedVideo.quiz`.
#[derive(sqlx::FromRow)]
struct FeedRow {
    id: i64,
    teacher_id: i64,
    teacher_name: String,
    title: String,
    description: String,
    video_url: String,
    thumbnail_url: Option<String>,
    subject: String,
    likes_count: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    quiz_id: Option<i64>,
    question: Option<String>,
    options: Option<SqlJson<Vec<String>>>,
    xp_reward: Option<i64>,
}

impl From<FeedRow> for FeedVideo {
    fn from(row: FeedRow) -> Self {
        let quiz = row.quiz_id.map(|quiz_id| PublicQuiz {
            id: quiz_id,
            video_id: row.id,
            question: row.question.unwrap_or_default(),
            options: row.options.unwrap_or(SqlJson(Vec::new())),
            xp_reward: row.xp_reward.unwrap_or(config::DEFAULT_XP_REWARD),
        });

        FeedVideo {
            id: row.id,
            teacher_id: row.teacher_id,
            teacher_name: row.teacher_name,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            subject: row.subject,
            likes_count: row.likes_count,
            created_at: row.created_at,
            quiz,
        }
    }
}

/// Paginated video feed, newest first, with an optional subject filter.
///
/// Each item carries its quiz in public form when one exists, so the feed is
/// a single request for the client.
pub async fn list_feed(
    State(pool): State<PgPool>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(config::DEFAULT_FEED_LIMIT)
        .clamp(1, config::MAX_FEED_LIMIT);
    // Any i64 page is a well-formed request; the offset saturates instead of
    // overflowing and the query just returns an empty page.
    let offset = (page - 1).saturating_mul(limit);

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM videos WHERE ($1::text IS NULL OR subject = $1)",
    )
    .bind(&params.subject)
    .fetch_one(&pool)
    .await?;

    let rows = sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT
            v.id,
            v.teacher_id,
            u.name AS teacher_name,
            v.title,
            v.description,
            v.video_url,
            v.thumbnail_url,
            v.subject,
            v.likes_count,
            v.created_at,
            q.id AS quiz_id,
            q.question,
            q.options,
            q.xp_reward
        FROM videos v
        JOIN users u ON u.id = v.teacher_id
        LEFT JOIN quizzes q ON q.video_id = v.id
        WHERE ($1::text IS NULL OR v.subject = $1)
        ORDER BY v.created_at DESC, v.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&params.subject)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let items: Vec<FeedVideo> = rows.into_iter().map(FeedVideo::from).collect();
    // An empty catalog still reports one (empty) page.
    let pages = ((total + limit - 1) / limit).max(1);

    Ok(Json(FeedResponse {
        items,
        pagination: Pagination {
            page,
            limit,
            total,
            pages,
        },
    }))
}

/// Publishes a video, optionally with its quiz in the same request.
///
/// Restricted to teacher and admin accounts. The description is sanitized
/// before storage. Video and quiz are committed together: a rejected quiz
/// never leaves an orphan video behind.
pub async fn create_video(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "teacher" && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "Only teachers can publish videos".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
    let description = clean_html(&payload.description);

    let mut tx = pool.begin().await?;

    let video_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO videos (teacher_id, title, description, video_url, thumbnail_url, subject)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(teacher_id)
    .bind(payload.title.trim())
    .bind(&description)
    .bind(&payload.video_url)
    .bind(&payload.thumbnail_url)
    .bind(payload.subject.trim())
    .fetch_one(&mut *tx)
    .await?;

    let quiz_id = match payload.quiz {
        Some(quiz) => {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO quizzes (video_id, question, options, correct_answer, xp_reward)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(video_id)
            .bind(&quiz.question)
            .bind(SqlJson(&quiz.options))
            .bind(quiz.correct_answer)
            .bind(quiz.xp_reward.unwrap_or(config::DEFAULT_XP_REWARD))
            .fetch_one(&mut *tx)
            .await?;
            Some(id)
        }
        None => None,
    };

    tx.commit().await?;

    tracing::info!("Teacher {} published video {}", teacher_id, video_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": video_id, "quiz_id": quiz_id })),
    ))
}

/// Toggle Like on a video.
pub async fn toggle_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM videos WHERE id = $1")
        .bind(video_id)
        .fetch_optional(&pool)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Video not found".to_string()));
    }

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT 1 FROM video_likes WHERE user_id = $1 AND video_id = $2",
    )
    .bind(user_id)
    .bind(video_id)
    .fetch_optional(&mut *tx)
    .await?;

    let is_liked = existing.is_some();

    let likes_count = if is_liked {
        let deleted = sqlx::query("DELETE FROM video_likes WHERE user_id = $1 AND video_id = $2")
            .bind(user_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // Racing unlikes both reach here; only the request whose DELETE
        // removed the row gets to decrement the counter.
        if deleted == 1 {
            sqlx::query_scalar::<_, i32>(
                "UPDATE videos SET likes_count = GREATEST(0, likes_count - 1) WHERE id = $1 RETURNING likes_count",
            )
            .bind(video_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar::<_, i32>("SELECT likes_count FROM videos WHERE id = $1")
                .bind(video_id)
                .fetch_one(&mut *tx)
                .await?
        }
    } else {
        sqlx::query("INSERT INTO video_likes (user_id, video_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                    // Concurrent request handled gracefully
                    return AppError::Conflict("Already liked".to_string());
                }
                AppError::InternalServerError(e.to_string())
            })?;

        sqlx::query_scalar::<_, i32>(
            "UPDATE videos SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
        )
        .bind(video_id)
        .fetch_one(&mut *tx)
        .await?
    };

    tx.commit().await?;

    Ok(Json(json!({ "liked": !is_liked, "likes_count": likes_count })))
}
