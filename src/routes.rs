// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, leaderboard, play, profile, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, assignments, users).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route(
            "/",
            get(quiz::list_quizzes).merge(post(quiz::create_quiz).layer(auth_layer.clone())),
        )
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/leaderboard", get(leaderboard::get_leaderboard))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/{id}/complete", get(quiz::get_complete_quiz))
                .route("/{id}/assignments", post(quiz::create_assignment))
                .route("/{id}/sessions", post(play::start_session))
                .route("/{id}/submit", post(play::submit_quiz))
                .layer(auth_layer.clone()),
        );

    let assignment_routes = Router::new()
        .route("/{id}/questions", post(quiz::create_question))
        .layer(auth_layer.clone());

    let user_routes = Router::new()
        .route("/me/attempts", get(profile::my_attempts))
        .layer(auth_layer);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/assignments", assignment_routes)
        .nest("/api/users", user_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use crate::config::Config;

    fn app() -> Router {
        let pool = SqlitePoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "router_test_secret".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            quiz_duration_secs: 600,
            submission_grace_ms: 2000,
        };
        create_router(AppState { pool, config })
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_token() {
        for (method, uri) in [
            ("POST", "/api/quizzes"),
            ("POST", "/api/quizzes/1/sessions"),
            ("POST", "/api/quizzes/1/submit"),
            ("GET", "/api/quizzes/1/complete"),
            ("POST", "/api/assignments/1/questions"),
            ("GET", "/api/users/me/attempts"),
        ] {
            let response = app()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }
}
