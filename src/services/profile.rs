// src/services/profile.rs

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::profile::{ProfileResponse, StudentProfile},
    services::collaborators::ProfileProvider,
};

/// Reads the profile API response cached on disk.
///
/// The file holds a single student; other ids get `None`. A missing or
/// unreadable file is logged and also yields `None`.
#[derive(Debug, Clone)]
pub struct JsonFileProfileProvider {
    path: PathBuf,
}

impl JsonFileProfileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProfileProvider for JsonFileProfileProvider {
    async fn get(&self, student_id: &str) -> Result<Option<StudentProfile>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Profile not readable at {}: {}", self.path.display(), e);
                return Ok(None);
            }
        };

        let response: ProfileResponse = match serde_json::from_str(&raw) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Profile file {} is malformed: {}", self.path.display(), e);
                return Ok(None);
            }
        };

        if !response.success {
            tracing::warn!(
                "Profile load failed: {}",
                response.message.unwrap_or_default()
            );
            return Ok(None);
        }

        Ok(response
            .data
            .map(StudentProfile::from)
            .filter(|profile| profile.student_id == student_id))
    }
}
