// src/services/retrieval.rs

//! Similarity search over the indexed question bank (Qdrant REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value as JsonValue, json};

use crate::{
    config::Config,
    error::AppError,
    models::question::RetrievedQuestion,
    services::{collaborators::QuestionRetriever, llm::OpenAiClient},
};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct QdrantRetriever {
    client: Client,
    embedder: OpenAiClient,
    base_url: String,
    collection: String,
}

impl QdrantRetriever {
    pub fn new(embedder: OpenAiClient, base_url: String, collection: String, client: Client) -> Self {
        Self {
            client,
            embedder,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection,
        }
    }

    /// `None` when no vector store is configured.
    pub fn from_config(config: &Config, embedder: OpenAiClient) -> Option<Self> {
        let url = config.qdrant_url.clone()?;
        Some(Self::new(
            embedder,
            url,
            config.qdrant_collection.clone(),
            Client::new(),
        ))
    }
}

/// Body of a points search, filtered on the payload's `subject` when given.
pub fn search_body(vector: &[f32], subject: Option<&str>, top_k: usize) -> JsonValue {
    let mut body = json!({
        "vector": vector,
        "limit": top_k,
        "with_payload": true,
    });
    if let Some(subject) = subject {
        body["filter"] = json!({
            "must": [{ "key": "subject", "match": { "value": subject } }]
        });
    }
    body
}

/// Turns a search response into questions. Hits without a usable payload are skipped.
pub fn parse_search_hits(body: &JsonValue) -> Vec<RetrievedQuestion> {
    let Some(hits) = body.get("result").and_then(|r| r.as_array()) else {
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let mut payload = hit.get("payload")?.clone();
            // Bank ids are sometimes stored as numbers.
            if let Some(id) = payload.get("id").and_then(|id| id.as_i64()) {
                payload["id"] = json!(id.to_string());
            }
            let mut question: RetrievedQuestion = match serde_json::from_value(payload) {
                Ok(question) => question,
                Err(e) => {
                    tracing::debug!("Skipping search hit with unexpected payload: {}", e);
                    return None;
                }
            };
            question.score = hit.get("score").and_then(|s| s.as_f64()).unwrap_or_default();
            Some(question)
        })
        .collect()
}

#[async_trait]
impl QuestionRetriever for QdrantRetriever {
    async fn search(
        &self,
        query: &str,
        subject: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedQuestion>, AppError> {
        let vector = self.embedder.embed(query).await?;

        let res = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.base_url, self.collection
            ))
            .json(&search_body(&vector, subject, top_k))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!(
                "Question search failed {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;
        let questions = parse_search_hits(&body);
        tracing::debug!("Question search returned {} hits", questions.len());
        Ok(questions)
    }
}
