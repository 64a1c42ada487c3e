// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method,
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config,
    handlers::{auth, profile, quiz, ranking, video},
    state::AppState,
    utils::jwt::auth_middleware,
};

async fn ping() -> &'static str {
    "pong"
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, videos, quizzes, ranking).
/// * Applies global middleware (Trace, CORS) and rate limiting on auth.
/// * Injects global state (pool + config).
///
/// The rate limiter keys on peer IP, so the server must be driven with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Credential stuffing is the only brute-force surface; everything else
    // is throttled well enough by auth itself.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(config::AUTH_RATE_LIMIT_BURST)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/attempts", get(profile::list_my_attempts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let video_routes = Router::new()
        .route("/", get(video::list_feed))
        // Protected video routes
        .merge(
            Router::new()
                .route("/", post(video::create_video))
                .route("/{id}/like", post(video::toggle_like))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/video/{id}", get(quiz::get_quiz_for_video))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/{id}/answer", post(quiz::submit_answer))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let ranking_routes = Router::new().route("/", get(ranking::get_ranking));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/videos", video_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/ranking", ranking_routes)
        .route("/api/ping", get(ping))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
