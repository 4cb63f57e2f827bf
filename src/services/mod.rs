// src/services/mod.rs

pub mod answer_sheet;
pub mod assistant;
pub mod collaborators;
pub mod grader;
pub mod intent;
pub mod lifecycle;
pub mod llm;
pub mod profile;
pub mod quiz_format;
pub mod retrieval;
