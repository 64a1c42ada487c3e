// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Cumulative XP needed to advance one level.
///
/// This is the single canonical value for the whole system; clients read it
/// from the profile payload (`xp_per_level`) instead of hard-coding a copy.
pub const XP_PER_LEVEL: i64 = 200;

/// XP awarded for a correct answer when the quiz does not set its own reward.
pub const DEFAULT_XP_REWARD: i64 = 50;

/// Every quiz carries exactly this many answer options.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Leaderboard page size bounds. Requested limits are clamped into
/// `1..=MAX_RANKING_LIMIT`.
pub const DEFAULT_RANKING_LIMIT: i64 = 20;
pub const MAX_RANKING_LIMIT: i64 = 100;

/// Video feed page size bounds.
pub const DEFAULT_FEED_LIMIT: i64 = 10;
pub const MAX_FEED_LIMIT: i64 = 50;

/// Rate limit for the auth endpoints: one token replenished per second on
/// top of this burst allowance.
pub const AUTH_RATE_LIMIT_BURST: u32 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Optional admin account seeded at startup when both are present.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(604_800); // 7 days

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
