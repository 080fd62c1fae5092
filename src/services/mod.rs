// src/services/mod.rs
pub mod classifier;
pub mod coach;
pub mod fallback;
pub mod llm_client;
pub mod metrics_manager;
pub mod models;
pub mod report_generator;
pub mod session_manager;
pub mod templates;
pub mod usage;
