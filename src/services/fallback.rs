// src/services/fallback.rs
use serde::Serialize;

use super::classifier::{KeywordRule, KeywordTable};
use super::templates::TemplateStore;

/// Generic reply blocks used when a richer answer is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackKind {
    Workout,
    Form,
    WarmUp,
    Greeting,
}

impl FallbackKind {
    pub const ALL: [FallbackKind; 4] = [
        FallbackKind::Workout,
        FallbackKind::Form,
        FallbackKind::WarmUp,
        FallbackKind::Greeting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackKind::Workout => "workout",
            FallbackKind::Form => "form",
            FallbackKind::WarmUp => "warm-up",
            FallbackKind::Greeting => "greeting",
        }
    }
}

const FALLBACK_RULES: &[KeywordRule<FallbackKind>] = &[
    KeywordRule {
        keywords: &["workout"],
        value: FallbackKind::Workout,
    },
    KeywordRule {
        keywords: &["form"],
        value: FallbackKind::Form,
    },
    KeywordRule {
        keywords: &["warm-up", "warmup", "warm up"],
        value: FallbackKind::WarmUp,
    },
];

const FALLBACK_TABLE: KeywordTable<FallbackKind> = KeywordTable::new(FALLBACK_RULES);

/// Coarse pick over the original prompt. Anything unmatched gets the greeting.
pub fn select(prompt: &str) -> FallbackKind {
    FALLBACK_TABLE.first_match(prompt).unwrap_or(FallbackKind::Greeting)
}

pub fn fallback_text<'a>(store: &'a TemplateStore, prompt: &str) -> &'a str {
    store.fallback(select(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_keyword_order() {
        assert_eq!(select("Create a workout plan"), FallbackKind::Workout);
        assert_eq!(select("check my squat FORM"), FallbackKind::Form);
        assert_eq!(select("a good warm-up?"), FallbackKind::WarmUp);
        assert_eq!(select("workout form"), FallbackKind::Workout);
        assert_eq!(select("what's up"), FallbackKind::Greeting);
    }

    #[test]
    fn text_is_never_empty() {
        let store = TemplateStore::embedded().unwrap();
        for prompt in ["workout", "form", "warmup", ""] {
            assert!(!fallback_text(&store, prompt).is_empty());
        }
    }
}
