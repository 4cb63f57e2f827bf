// tests/api_tests.rs

mod common;

use std::sync::Arc;

use common::{FakeGenerator, FakeModel, FakeResponder, NoProfiles, test_pool};
use quiz_lifecycle::{
    config::Config,
    routes,
    services::assistant::{Assistant, Collaborators},
    state::AppState,
    utils::jwt::{Role, sign_jwt},
};
use sqlx::SqlitePool;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    pool: SqlitePool,
}

impl TestApp {
    fn token(&self, student_id: &str) -> String {
        sign_jwt(student_id, Role::Student, JWT_SECRET, 600).expect("Failed to sign token")
    }

    fn admin_token(&self) -> String {
        sign_jwt("admin", Role::Admin, JWT_SECRET, 600).expect("Failed to sign token")
    }

    async fn chat(&self, token: &str, message: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/chat", self.address))
            .bearer_auth(token)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Spawns the app on a random port with an in-memory database and fake
/// language-model collaborators.
async fn spawn_app() -> TestApp {
    let pool = test_pool().await;

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        openai_api_key: "unused".to_string(),
        openai_base_url: "http://127.0.0.1:9".to_string(),
        openai_model: "unused".to_string(),
        embedding_model: "unused".to_string(),
        qdrant_url: None,
        qdrant_collection: "unused".to_string(),
        student_profile_path: "data/api/student.json".to_string(),
    };

    let model = Arc::new(FakeModel::default());
    let assistant = Assistant::new(
        pool.clone(),
        Collaborators {
            model,
            generator: Arc::new(FakeGenerator::default()),
            responder: Arc::new(FakeResponder),
            profiles: Arc::new(NoProfiles),
            retriever: None,
        },
    );

    let state = AppState {
        pool: pool.clone(),
        config,
        assistant: Arc::new(assistant),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/random_path_that_does_not_exist", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn chat_requires_token() {
    let app = spawn_app().await;

    let response = app.chat("not-a-token", "xin chào").await;

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn empty_message_fails_validation() {
    let app = spawn_app().await;
    let token = app.token("s1");

    let response = app.chat(&token, "").await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn whitespace_message_fails_validation() {
    let app = spawn_app().await;
    let token = app.token("s1");

    let response = app.chat(&token, "   \n\t ").await;
    assert_eq!(response.status().as_u16(), 400);

    let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(recorded, 0);
}

#[tokio::test]
async fn quiz_lifecycle_over_http() {
    let app = spawn_app().await;
    let token = app.token("s1");

    // 1. Create a quiz
    let response = app.chat(&token, "Tạo đề Vật lý về Lực").await;
    assert_eq!(response.status().as_u16(), 200);
    let created: serde_json::Value = response.json().await.unwrap();
    let quiz_id = created["quiz_id"].as_str().expect("quiz_id missing").to_string();

    // 2. The pending quiz is visible, without its answer key
    let pending: serde_json::Value = app
        .get(&token, "/api/quizzes/pending")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(pending["id"], quiz_id.as_str());
    assert_eq!(pending["status"], "pending");
    assert!(pending.get("answer_key").is_none());

    // 3. A second quiz is refused with the pending id
    let response = app.chat(&token, "Tạo đề Vật lý về Lực").await;
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["resource_id"], quiz_id.as_str());

    // 4. Submit
    let response = app
        .chat(&token, "1-A,2-B,3-C,4-D,5-A,6-B,7-C,8-D,9-A,10-C")
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let graded: serde_json::Value = response.json().await.unwrap();
    assert_eq!(graded["submission"]["score"], 9);
    let submission_id = graded["submission"]["id"].as_str().unwrap().to_string();

    // 5. Nothing pending anymore
    let pending: serde_json::Value = app
        .get(&token, "/api/quizzes/pending")
        .await
        .json()
        .await
        .unwrap();
    assert!(pending.is_null());

    // 6. Submission details
    let response = app
        .get(&token, &format!("/api/submissions/{}", submission_id))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let details: serde_json::Value = response.json().await.unwrap();
    assert_eq!(details["correct_count"], 9);
    assert_eq!(details["details"].as_array().unwrap().len(), 10);

    // 7. History holds both sides of all three exchanges
    let history: Vec<serde_json::Value> = app
        .get(&token, "/api/chat/history?limit=50")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 6);
}

#[tokio::test]
async fn quizzes_are_private() {
    let app = spawn_app().await;
    let owner = app.token("owner");
    let other = app.token("other");

    let created: serde_json::Value = app
        .chat(&owner, "Tạo đề Vật lý về Lực")
        .await
        .json()
        .await
        .unwrap();
    let quiz_id = created["quiz_id"].as_str().unwrap();

    let response = app.get(&owner, &format!("/api/quizzes/{}", quiz_id)).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get(&other, &format!("/api/quizzes/{}", quiz_id)).await;
    assert_eq!(response.status().as_u16(), 404);

    let listing: serde_json::Value = app.get(&other, "/api/quizzes").await.json().await.unwrap();
    assert_eq!(listing["pagination"]["total"], 0);
}

#[tokio::test]
async fn listing_validates_page_size() {
    let app = spawn_app().await;
    let token = app.token("s1");

    let response = app.get(&token, "/api/quizzes?size=500").await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = spawn_app().await;
    let student = app.token("s1");

    app.chat(&student, "Tạo đề Vật lý về Lực").await;

    let response = app.get(&student, "/api/admin/stats").await;
    assert_eq!(response.status().as_u16(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Admin access required");

    let response = app.get(&app.admin_token(), "/api/admin/stats").await;
    assert_eq!(response.status().as_u16(), 200);
    let stats: serde_json::Value = response.json().await.unwrap();
    assert_eq!(stats["total_quizzes"], 1);

    let listing: serde_json::Value = app
        .get(&app.admin_token(), "/api/admin/quizzes?student_id=s1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn daily_count_and_stats_for_student() {
    let app = spawn_app().await;
    let token = app.token("s1");

    app.chat(&token, "Tạo đề Vật lý về Lực").await;

    let counts: Vec<serde_json::Value> = app
        .get(&token, "/api/quizzes/daily-count")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0]["count"], 1);

    let stats: serde_json::Value = app.get(&token, "/api/stats").await.json().await.unwrap();
    assert_eq!(stats["by_subject"]["Vật lý"], 1);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(total, 1);
}
