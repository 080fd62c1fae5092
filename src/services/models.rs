// src/services/models.rs
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    #[serde(alias = "Beginner", alias = "BEGINNER")]
    Beginner,
    #[serde(alias = "Intermediate", alias = "INTERMEDIATE")]
    Intermediate,
    #[serde(alias = "Advanced", alias = "ADVANCED")]
    Advanced,
}

impl FitnessLevel {
    pub const ALL: [FitnessLevel; 3] = [
        FitnessLevel::Beginner,
        FitnessLevel::Intermediate,
        FitnessLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }

    /// Uppercase label used inside rendered plans.
    pub fn label(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "BEGINNER",
            FitnessLevel::Intermediate => "INTERMEDIATE",
            FitnessLevel::Advanced => "ADVANCED",
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(FitnessLevel::Beginner),
            "intermediate" => Ok(FitnessLevel::Intermediate),
            "advanced" => Ok(FitnessLevel::Advanced),
            other => Err(format!("unknown fitness level: {other}")),
        }
    }
}

/// One request for a generated plan. Built per user action and dropped after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutRequest {
    pub goals: Vec<String>,
    pub fitness_level: FitnessLevel,
    pub available_time_minutes: u32,
    pub equipment: Vec<String>,
}

impl WorkoutRequest {
    pub fn new(
        goals: impl IntoIterator<Item = impl Into<String>>,
        fitness_level: FitnessLevel,
        available_time_minutes: u32,
        equipment: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            goals: dedup(goals),
            fitness_level,
            available_time_minutes,
            equipment: dedup(equipment),
        }
    }

    pub fn goals_text(&self) -> String {
        self.goals.join(" ")
    }

    pub fn equipment_description(&self) -> String {
        describe_equipment(&self.equipment)
    }
}

pub fn describe_equipment(equipment: &[String]) -> String {
    if equipment.is_empty() {
        "bodyweight only".to_string()
    } else {
        equipment.join(", ")
    }
}

// Trimmed, non-empty, first occurrence wins.
fn dedup(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item: String = item.into();
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_from_ai: bool,
    pub timestamp_ms: u64,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>, is_from_ai: bool) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_from_ai,
            timestamp_ms,
        }
    }
}
