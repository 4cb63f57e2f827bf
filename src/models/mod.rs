// src/models/mod.rs

pub mod chat;
pub mod intent;
pub mod profile;
pub mod question;
pub mod quiz;
pub mod submission;
