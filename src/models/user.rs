// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::scoring;

/// Represents the 'users' table in the database.
///
/// Note that there is no `level` field: level is always derived from `xp`
/// via the leveling policy, never stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Unique, lowercased at registration.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'student', 'teacher' or 'admin'.
    pub role: String,

    /// Cumulative experience points. Only ever increases.
    pub xp: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Public view of an account, as returned by register/login.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub xp: i64,
    /// Derived from `xp` on every read.
    pub level: i64,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            level: scoring::level_from_xp(user.xp),
            xp: user.xp,
        }
    }
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub xp: i64,
    pub level: i64,

    /// XP accumulated inside the current level, and the size of a level.
    /// Clients render progress bars from these instead of hard-coding the
    /// level size.
    pub xp_into_level: i64,
    pub xp_per_level: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Lifetime answer statistics, read from the answer audit log.
    pub attempts_count: i64,
    pub correct_count: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,

    #[validate(
        email(message = "A valid e-mail address is required."),
        length(max = 254)
    )]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,

    /// Optional role selection; defaults to 'student'.
    /// 'admin' is not accepted here; admin accounts exist only through
    /// startup seeding.
    #[validate(custom(function = validate_registration_role))]
    pub role: Option<String>,
}

fn validate_registration_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != "student" && role != "teacher" {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
