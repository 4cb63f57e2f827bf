// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{chat, health, quiz, submission},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Every `/api` route requires a bearer token; the `sub` claim is the student id.
/// * Admin routes additionally require the `admin` role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let chat_routes = Router::new()
        .route("/", post(chat::send_message))
        .route("/history", get(chat::get_history));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/latest", get(quiz::latest_quiz))
        .route("/pending", get(quiz::pending_quiz))
        .route("/daily-count", get(quiz::daily_counts))
        .route("/{id}", get(quiz::get_quiz));

    let submission_routes = Router::new()
        .route("/", get(submission::list_submissions))
        .route("/{id}", get(submission::get_submission));

    let student_routes = Router::new()
        .nest("/chat", chat_routes)
        .nest("/quizzes", quiz_routes)
        .nest("/submissions", submission_routes)
        .route("/stats", get(quiz::quiz_stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/quizzes", get(quiz::admin_list_quizzes))
        .route("/stats", get(quiz::admin_quiz_stats))
        // Auth first, then the role check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", student_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
