// src/message.rs
use serde::{Deserialize, Serialize};

use crate::services::classifier::Category;
use crate::services::coach::ReplySource;
use crate::services::models::FitnessLevel;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source: String,
}

#[derive(Deserialize)]
pub struct WorkoutPlanRequest {
    #[serde(default)]
    pub goals: Vec<String>,
    pub fitness_level: FitnessLevel,
    pub available_time_minutes: u32,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub export_pdf: bool,
}

#[derive(Deserialize)]
pub struct QuickWorkoutRequest {
    pub duration_minutes: u32,
    #[serde(default)]
    pub equipment: Vec<String>,
}

#[derive(Deserialize)]
pub struct FormTipsRequest {
    pub exercise: String,
}

#[derive(Serialize, Deserialize)]
pub struct PlanResponse {
    pub category: Category,
    pub plan: String,
    pub source: ReplySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct FormTipsResponse {
    pub tips: String,
    pub source: ReplySource,
}
