// src/main.rs

use std::{path::Path, str::FromStr, sync::Arc, time::Duration};

use dotenvy::dotenv;
use quiz_lifecycle::{
    config::Config,
    routes,
    services::{
        assistant::{Assistant, Collaborators},
        collaborators::QuestionRetriever,
        llm::OpenAiClient,
        profile::JsonFileProfileProvider,
        retrieval::QdrantRetriever,
    },
    state::AppState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // SQLite will not create the parent directory itself
    if let Some(parent) = Path::new(connect_options.get_filename()).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_options)
        .await?;

    tracing::info!("Database connected: {}", config.database_url);

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let llm = Arc::new(OpenAiClient::from_config(&config));

    let retriever = QdrantRetriever::from_config(&config, llm.as_ref().clone())
        .map(|r| Arc::new(r) as Arc<dyn QuestionRetriever>);
    match &config.qdrant_url {
        Some(url) => tracing::info!("Question search enabled: {} ({})", url, config.qdrant_collection),
        None => tracing::info!("QDRANT_URL not set, answering without question search"),
    }

    let collaborators = Collaborators {
        model: llm.clone(),
        generator: llm.clone(),
        responder: llm,
        profiles: Arc::new(JsonFileProfileProvider::new(&config.student_profile_path)),
        retriever,
    };

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        assistant: Arc::new(Assistant::new(pool, collaborators)),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
