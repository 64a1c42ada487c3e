// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, PublicUser, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. Everyone starts at
/// 0 XP, which the leveling policy reads as level 1.
/// Returns 201 Created with a signed token and the public user object.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let email = payload.email.trim().to_lowercase();
    let role = payload.role.as_deref().unwrap_or("student");

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, email, password, role, xp, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&email)
    .bind(&hashed_password)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!("Registered user {} ({})", user.id, user.role);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "user": PublicUser::from(user)
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password produce the same 401 message, so the
/// endpoint does not leak which accounts exist.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, xp, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "user": PublicUser::from(user)
    })))
}

/// Ensures the configured admin account exists. Runs once at startup.
///
/// The address is normalized the same way `register` and `login` normalize
/// theirs; a mixed-case `ADMIN_EMAIL` must still produce an account that can
/// log in. Re-running against an existing account is a no-op.
pub async fn seed_admin_user(pool: &PgPool, email: &str, password: &str) -> Result<(), AppError> {
    let email = email.trim().to_lowercase();

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    if existing.is_none() {
        tracing::info!("Seeding admin user: {}", email);
        let hashed_password = hash_password(password)?;

        sqlx::query(
            "INSERT INTO users (name, email, password, role) VALUES ('Admin', $1, $2, 'admin')",
        )
        .bind(&email)
        .bind(hashed_password)
        .execute(pool)
        .await?;
        tracing::info!("Admin user created successfully.");
    }

    Ok(())
}
