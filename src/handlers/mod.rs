// src/handlers/mod.rs

pub mod chat;
pub mod health;
pub mod quiz;
pub mod submission;
