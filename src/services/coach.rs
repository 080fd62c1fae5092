// src/services/coach.rs
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classifier::{Category, EQUIPMENT_TABLE, EXERCISE_TABLE, LEVEL_TABLE, classify};
use super::fallback::{self, FallbackKind};
use super::llm_client::{LlmClient, RetryPolicy, complete_with_retry};
use super::models::{FitnessLevel, WorkoutRequest, describe_equipment};
use super::templates::TemplateStore;
use super::usage::UsageGate;
use crate::error::LlmError;

const SYSTEM_PROMPT: &str = include_str!("../../templates/system_prompt.txt");

pub const DEFAULT_CHAT_MINUTES: u32 = 30;
pub const QUICK_LEVEL: FitnessLevel = FitnessLevel::Intermediate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Template,
    Llm,
    Fallback,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Template => "template",
            ReplySource::Llm => "llm",
            ReplySource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachReply {
    pub text: String,
    pub category: Option<Category>,
    pub source: ReplySource,
}

/// What a chat message is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    Greeting,
    FormTips { key: &'static str, exercise: String },
    Workout {
        category: Category,
        level: FitnessLevel,
        minutes: u32,
        equipment: Vec<String>,
    },
}

const GREETING_WORDS: &[&str] = &[
    "hi", "hello", "hey", "hiya", "howdy", "yo", "there", "coach", "good", "morning", "afternoon",
    "evening",
];

pub fn detect_intent(message: &str) -> ChatIntent {
    let lower = message.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.len() <= 3 && words.iter().all(|w| GREETING_WORDS.contains(w)) {
        return ChatIntent::Greeting;
    }

    if words.iter().any(|w| matches!(*w, "form" | "technique")) {
        if let Some(key) = EXERCISE_TABLE.first_match(&lower) {
            return ChatIntent::FormTips {
                key,
                exercise: display_exercise(key),
            };
        }
    }

    ChatIntent::Workout {
        category: classify(&lower),
        level: detect_level(&lower).unwrap_or(FitnessLevel::Intermediate),
        minutes: extract_minutes(&lower).unwrap_or(DEFAULT_CHAT_MINUTES),
        equipment: detect_equipment(&lower),
    }
}

pub fn detect_level(text: &str) -> Option<FitnessLevel> {
    LEVEL_TABLE.first_match(text)
}

pub fn detect_equipment(text: &str) -> Vec<String> {
    EQUIPMENT_TABLE
        .all_matches(text)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// First "<n> min", "<n>-minute", "<n>min" or "<n> hour" in the text.
pub fn extract_minutes(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect();
    for (i, word) in words.iter().enumerate() {
        let digits_len = word.chars().take_while(char::is_ascii_digit).count();
        if digits_len == 0 {
            continue;
        }
        let Ok(value) = word[..digits_len].parse::<u32>() else {
            continue;
        };
        let rest = &word[digits_len..];
        let unit = if rest.is_empty() {
            words.get(i + 1).copied().unwrap_or_default()
        } else {
            rest
        };
        if unit.starts_with("min") {
            return Some(value);
        }
        if unit.starts_with("hour") || unit.starts_with("hr") {
            return Some(value.saturating_mul(60));
        }
    }
    None
}

fn display_exercise(key: &str) -> String {
    let spaced = key.replace('-', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Produces coaching text. Every public operation returns a non-empty reply;
/// remote failures degrade to the fallback blocks and nothing is raised.
#[derive(Clone)]
pub struct CoachService {
    store: Arc<TemplateStore>,
    llm: Option<Arc<dyn LlmClient>>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CoachService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachService")
            .field("online", &self.is_online())
            .field("retry", &self.retry)
            .finish()
    }
}

impl CoachService {
    /// Offline coach: templates only.
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self {
            store,
            llm: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        self.llm = Some(client);
        self.retry = retry;
        self
    }

    pub fn is_online(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn generate_workout_plan(
        &self,
        request: &WorkoutRequest,
        usage: &mut dyn UsageGate,
    ) -> CoachReply {
        let category = classify(&request.goals_text());
        let level = request.fitness_level;
        let minutes = request.available_time_minutes;
        let equipment = request.equipment_description();
        let prompt = format!(
            "Create a {level} workout plan for these goals: {}. \
             Available time: {minutes} minutes. Equipment: {equipment}.",
            request.goals.join(", ")
        );
        self.answer(&prompt, Some(category), usage, || {
            self.store.render_workout(category, level, minutes, &equipment)
        })
        .await
    }

    pub async fn generate_quick_workout(
        &self,
        duration_minutes: u32,
        equipment: &[String],
        usage: &mut dyn UsageGate,
    ) -> CoachReply {
        let equipment = describe_equipment(equipment);
        let prompt = format!(
            "Create a quick {duration_minutes}-minute workout using: {equipment}."
        );
        self.answer(&prompt, Some(Category::Quick), usage, || {
            self.store
                .render_workout(Category::Quick, QUICK_LEVEL, duration_minutes, &equipment)
        })
        .await
    }

    pub async fn generate_form_tips(
        &self,
        exercise: &str,
        usage: &mut dyn UsageGate,
    ) -> CoachReply {
        let exercise = exercise.trim();
        let key = EXERCISE_TABLE.first_match(exercise).unwrap_or("general");
        let name = if exercise.is_empty() { "this exercise" } else { exercise };
        let prompt = format!("Give proper form tips and common mistakes for {name}.");
        self.answer(&prompt, None, usage, || self.store.render_form_tips(key, name))
            .await
    }

    /// Reply to a free-text chat message.
    pub async fn reply(&self, message: &str, usage: &mut dyn UsageGate) -> CoachReply {
        let intent = detect_intent(message);
        debug!(?intent, "chat intent");
        match intent {
            ChatIntent::Greeting => {
                self.answer(message, None, usage, || {
                    self.store.fallback(FallbackKind::Greeting).to_string()
                })
                .await
            }
            ChatIntent::FormTips { key, exercise } => {
                self.answer(message, None, usage, || self.store.render_form_tips(key, &exercise))
                    .await
            }
            ChatIntent::Workout {
                category,
                level,
                minutes,
                equipment,
            } => {
                let equipment = describe_equipment(&equipment);
                self.answer(message, Some(category), usage, || {
                    self.store.render_workout(category, level, minutes, &equipment)
                })
                .await
            }
        }
    }

    async fn answer(
        &self,
        prompt: &str,
        category: Option<Category>,
        usage: &mut dyn UsageGate,
        offline: impl FnOnce() -> String,
    ) -> CoachReply {
        let Some(client) = &self.llm else {
            return CoachReply {
                text: offline(),
                category,
                source: ReplySource::Template,
            };
        };

        if !usage.try_reserve(Instant::now()).await {
            info!("remote coach unavailable for session, using templates");
            return CoachReply {
                text: offline(),
                category,
                source: ReplySource::Template,
            };
        }

        match complete_with_retry(client.as_ref(), self.retry, SYSTEM_PROMPT, prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                usage.record_success().await;
                CoachReply {
                    text,
                    category,
                    source: ReplySource::Llm,
                }
            }
            Ok(_) => {
                warn!("remote coach returned an empty reply, using fallback");
                let text = fallback::fallback_text(&self.store, prompt).to_string();
                CoachReply {
                    text,
                    category,
                    source: ReplySource::Fallback,
                }
            }
            Err(err) => {
                if err == LlmError::RateLimited {
                    usage.record_rate_limit(Instant::now()).await;
                }
                warn!(error = %err, "remote coach failed, using fallback");
                let text = fallback::fallback_text(&self.store, prompt).to_string();
                CoachReply {
                    text,
                    category,
                    source: ReplySource::Fallback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_minutes_in_common_shapes() {
        assert_eq!(extract_minutes("give me a 20 minute workout"), Some(20));
        assert_eq!(extract_minutes("15-minute core"), Some(15));
        assert_eq!(extract_minutes("45min session"), Some(45));
        assert_eq!(extract_minutes("1 hour of yoga"), Some(60));
        assert_eq!(extract_minutes("3 sets of squats"), None);
    }

    #[test]
    fn greeting_only_for_short_openers() {
        assert_eq!(detect_intent("Hello!"), ChatIntent::Greeting);
        assert_eq!(detect_intent("   "), ChatIntent::Greeting);
        assert!(matches!(
            detect_intent("hi, I need a long leg workout for my gym day"),
            ChatIntent::Workout {
                category: Category::Legs,
                ..
            }
        ));
        // "this" must not read as "hi"
        assert!(matches!(detect_intent("this hiit thing"), ChatIntent::Workout { .. }));
    }

    #[test]
    fn form_question_routes_to_tips() {
        assert_eq!(
            detect_intent("How is my deadlift form?"),
            ChatIntent::FormTips {
                key: "deadlift",
                exercise: "Deadlift".to_string(),
            }
        );
        assert_eq!(display_exercise("bench-press"), "Bench press");
    }

    #[test]
    fn form_must_be_a_whole_word() {
        assert!(matches!(
            detect_intent("I want to perform a 30 minute leg workout with squats"),
            ChatIntent::Workout {
                category: Category::Legs,
                minutes: 30,
                ..
            }
        ));
        assert!(matches!(
            detect_intent("squat technique please"),
            ChatIntent::FormTips { key: "squat", .. }
        ));
    }

    #[test]
    fn workout_intent_collects_parameters() {
        let intent = detect_intent("advanced 40 min upper body with dumbbells");
        assert_eq!(
            intent,
            ChatIntent::Workout {
                category: Category::Upper,
                level: FitnessLevel::Advanced,
                minutes: 40,
                equipment: vec!["dumbbells".to_string()],
            }
        );
    }
}
