// tests/api_tests.rs

use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use studyreels::{config::Config, routes, state::AppState, utils::jwt::Claims};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345"), or `None` when no
/// test database is configured, in which case the test is skipped.
async fn spawn_app() -> Option<String> {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState { pool, config };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background. Connect-info is required by the
    // peer-IP rate limiter on the auth routes.
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(address)
}

fn unique_email(tag: &str) -> String {
    format!("{}_{}@example.com", tag, &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn ping_works() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/ping", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn register_works_and_starts_at_level_one() {
    // Arrange
    let address = match spawn_app().await {
        Some(a) => a,
        None => return,
    };
    let client = reqwest::Client::new();
    let email = unique_email("reg");

    // Act
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Ada",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["xp"], 0);
    assert_eq!(body["user"]["level"], 1);
    assert!(body["user"]["password"].is_null(), "password must never be serialized");
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("dup");
    let payload = serde_json::json!({
        "name": "First",
        "email": email,
        "password": "password123"
    });

    let first = client
        .post(&format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    // Same address again, different case: emails are lowercased on write.
    let second = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Second",
            "email": email.to_uppercase(),
            "password": "password456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn register_fails_validation() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Not an email address
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Bad Email",
            "email": "not-an-email",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Password too short
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Short",
            "email": unique_email("short"),
            "password": "abc"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Admin role cannot be self-selected
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Mallory",
            "email": unique_email("mallory"),
            "password": "password123",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_does_not_reveal_which_credential_failed() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("login");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Login User",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    // Wrong password
    let wrong_password = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status().as_u16(), 401);
    let wrong_password_body: serde_json::Value = wrong_password.json().await.unwrap();

    // Unknown account
    let unknown = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": unique_email("ghost"),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 401);
    let unknown_body: serde_json::Value = unknown.json().await.unwrap();

    assert_eq!(wrong_password_body["error"], unknown_body["error"]);

    // And the real credentials still work
    let ok = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let ok_body: serde_json::Value = ok.json().await.unwrap();
    assert!(ok_body["token"].as_str().is_some());
}

#[tokio::test]
async fn seeded_admin_email_is_normalized_for_login() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").unwrap();

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");

    // Mixed-case, padded address, the way a hand-edited .env tends to carry it
    let suffix = uuid::Uuid::new_v4().to_string();
    let suffix = &suffix[..8];
    let configured = format!("  Admin_{}@Example.COM ", suffix);

    studyreels::handlers::auth::seed_admin_user(&pool, &configured, "admin_password123")
        .await
        .unwrap();

    // Seeding again is a no-op, not a duplicate account
    studyreels::handlers::auth::seed_admin_user(&pool, &configured, "admin_password123")
        .await
        .unwrap();

    let login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": format!("admin_{}@example.com", suffix),
            "password": "admin_password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);

    let body: serde_json::Value = login.json().await.unwrap();
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn profile_requires_auth() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/profile/me", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(&format!("{}/api/profile/me", address))
        .header("Authorization", "Bearer not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn profile_reports_leveling_fields() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("me");

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Profile User",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = register["token"].as_str().unwrap();

    let me: serde_json::Value = client
        .get(&format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["email"], email);
    assert_eq!(me["xp"], 0);
    assert_eq!(me["level"], 1);
    assert_eq!(me["xp_into_level"], 0);
    assert_eq!(me["xp_per_level"], 200);
    assert_eq!(me["attempts_count"], 0);
    assert_eq!(me["correct_count"], 0);
}

#[tokio::test]
async fn students_cannot_publish_videos() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Just A Student",
            "email": unique_email("student"),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = register["token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Nope",
            "video_url": "https://cdn.example.com/v/nope.mp4",
            "subject": "math"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn malformed_token_subject_is_unauthorized() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Correctly signed, but the subject is not a user id. Only a token minted
    // outside this service can look like this; it must not get past auth.
    let claims = Claims {
        sub: "not-a-number".to_string(),
        role: "teacher".to_string(),
        exp: 4102444800, // 2100-01-01
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("test_secret_for_integration_tests".as_bytes()),
    )
    .unwrap();

    let publish = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Ghost upload",
            "video_url": "https://cdn.example.com/v/ghost.mp4",
            "subject": "math"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(publish.status().as_u16(), 401);

    let like = client
        .post(&format!("{}/api/videos/1/like", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(like.status().as_u16(), 401);
}

#[tokio::test]
async fn feed_lists_video_with_public_quiz() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Teacher account
    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Feed Teacher",
            "email": unique_email("feedteacher"),
            "password": "password123",
            "role": "teacher"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = register["token"].as_str().unwrap();

    // Unique subject so the filter isolates this test's video
    let subject = format!("subject_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let created = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Fractions in 60 seconds",
            "description": "Halves and <b>quarters</b><script>alert(1)</script>",
            "video_url": "https://cdn.example.com/v/fractions.mp4",
            "subject": subject,
            "quiz": {
                "question": "What is 1/2 + 1/4?",
                "options": ["1/6", "2/6", "3/4", "1"],
                "correct_answer": 2
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let feed: serde_json::Value = client
        .get(&format!("{}/api/videos?subject={}", address, subject))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(feed["pagination"]["total"], 1);
    assert_eq!(feed["pagination"]["pages"], 1);

    let video = &items[0];
    assert_eq!(video["title"], "Fractions in 60 seconds");
    assert_eq!(video["teacher_name"], "Feed Teacher");
    // Sanitizer kept safe markup and dropped the script
    let description = video["description"].as_str().unwrap();
    assert!(description.contains("<b>quarters</b>"));
    assert!(!description.contains("script"));

    // Quiz rides along in public form
    assert_eq!(video["quiz"]["question"], "What is 1/2 + 1/4?");
    assert_eq!(video["quiz"]["xp_reward"], 50);
    assert!(
        video["quiz"].get("correct_answer").is_none(),
        "feed must not leak the answer key"
    );
}

#[tokio::test]
async fn feed_rejects_bad_video_url() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "URL Teacher",
            "email": unique_email("urlteacher"),
            "password": "password123",
            "role": "teacher"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = register["token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Broken",
            "video_url": "not a url",
            "subject": "math"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn feed_handles_extreme_page_numbers() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // The largest representable page is still just an empty page, not a 500.
    let response = client
        .get(&format!("{}/api/videos?page={}", address, i64::MAX))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let feed: serde_json::Value = response.json().await.unwrap();
    assert_eq!(feed["items"].as_array().unwrap().len(), 0);
    assert!(feed["pagination"]["pages"].as_i64().unwrap() >= 1);

    // Same with a limit riding along
    let response = client
        .get(&format!("{}/api/videos?page={}&limit=50", address, i64::MAX - 1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn like_toggles_on_and_off() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Like Teacher",
            "email": unique_email("liketeacher"),
            "password": "password123",
            "role": "teacher"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = register["token"].as_str().unwrap();

    let created: serde_json::Value = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Likeable",
            "video_url": "https://cdn.example.com/v/like.mp4",
            "subject": "art"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let video_id = created["id"].as_i64().unwrap();

    // Anonymous likes are rejected
    let anonymous = client
        .post(&format!("{}/api/videos/{}/like", address, video_id))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    // First toggle: on
    let liked: serde_json::Value = client
        .post(&format!("{}/api/videos/{}/like", address, video_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["likes_count"], 1);

    // Second toggle: off
    let unliked: serde_json::Value = client
        .post(&format!("{}/api/videos/{}/like", address, video_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unliked["liked"], false);
    assert_eq!(unliked["likes_count"], 0);

    // Unknown video
    let missing = client
        .post(&format!("{}/api/videos/99999999/like", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn like_counter_matches_rows_after_concurrent_unlikes() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").unwrap();

    let teacher: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Unlike Teacher",
            "email": unique_email("unliketeacher"),
            "password": "password123",
            "role": "teacher"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let teacher_token = teacher["token"].as_str().unwrap();

    let fan: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": "Steady Fan",
            "email": unique_email("fan"),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let fan_token = fan["token"].as_str().unwrap();

    let created: serde_json::Value = client
        .post(&format!("{}/api/videos", address))
        .header("Authorization", format!("Bearer {}", teacher_token))
        .json(&serde_json::json!({
            "title": "Contested",
            "video_url": "https://cdn.example.com/v/contested.mp4",
            "subject": "art"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let video_id = created["id"].as_i64().unwrap();

    // Two likes on the board
    for token in [teacher_token, fan_token] {
        let response = client
            .post(&format!("{}/api/videos/{}/like", address, video_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // The teacher unlikes twice at once. Whatever the interleaving, the
    // counter must keep agreeing with the like rows, and the fan's like
    // must never be eaten by the losing request's decrement.
    let url = format!("{}/api/videos/{}/like", address, video_id);
    let auth = format!("Bearer {}", teacher_token);
    let first = client.post(&url).header("Authorization", &auth).send();
    let second = client.post(&url).header("Authorization", &auth).send();
    let (first, second) = tokio::join!(first, second);
    assert!(first.unwrap().status().is_success());
    assert!(second.unwrap().status().is_success());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    let (counter, rows): (i32, i64) = sqlx::query_as(
        "SELECT v.likes_count, (SELECT COUNT(*) FROM video_likes l WHERE l.video_id = v.id) \
         FROM videos v WHERE v.id = $1",
    )
    .bind(video_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(
        i64::from(counter),
        rows,
        "likes_count drifted from the actual like rows"
    );
    assert!(counter >= 1);
}
