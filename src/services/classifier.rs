// src/services/classifier.rs
//! Keyword classification.
//!
//! Every lookup here is an ordered table of keyword rules: the text is
//! lower-cased and the first rule with a keyword contained in it wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::FitnessLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Push,
    Pull,
    Legs,
    Core,
    Hiit,
    Yoga,
    Pilates,
    Upper,
    Lower,
    Functional,
    Strength,
    Cardio,
    FatLoss,
    Flexibility,
    Quick,
    Home,
    Beginner,
    Advanced,
    General,
}

impl Category {
    pub const ALL: [Category; 19] = [
        Category::Push,
        Category::Pull,
        Category::Legs,
        Category::Core,
        Category::Hiit,
        Category::Yoga,
        Category::Pilates,
        Category::Upper,
        Category::Lower,
        Category::Functional,
        Category::Strength,
        Category::Cardio,
        Category::FatLoss,
        Category::Flexibility,
        Category::Quick,
        Category::Home,
        Category::Beginner,
        Category::Advanced,
        Category::General,
    ];

    /// Key used for template file names and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Push => "push",
            Category::Pull => "pull",
            Category::Legs => "legs",
            Category::Core => "core",
            Category::Hiit => "hiit",
            Category::Yoga => "yoga",
            Category::Pilates => "pilates",
            Category::Upper => "upper",
            Category::Lower => "lower",
            Category::Functional => "functional",
            Category::Strength => "strength",
            Category::Cardio => "cardio",
            Category::FatLoss => "fat-loss",
            Category::Flexibility => "flexibility",
            Category::Quick => "quick",
            Category::Home => "home",
            Category::Beginner => "beginner",
            Category::Advanced => "advanced",
            Category::General => "general",
        }
    }

    pub fn from_key(key: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword group and the value it maps to.
#[derive(Debug)]
pub struct KeywordRule<T: 'static> {
    pub keywords: &'static [&'static str],
    pub value: T,
}

/// Ordered rules checked front to back; the first hit wins.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable<T: 'static> {
    rules: &'static [KeywordRule<T>],
}

impl<T: Copy> KeywordTable<T> {
    pub const fn new(rules: &'static [KeywordRule<T>]) -> Self {
        Self { rules }
    }

    pub fn first_match(&self, text: &str) -> Option<T> {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
            .map(|rule| rule.value)
    }

    /// Every value whose rule matches, in table order, without repeats.
    pub fn all_matches(&self, text: &str) -> Vec<T>
    where
        T: PartialEq,
    {
        let lower = text.to_lowercase();
        let mut out = Vec::new();
        for rule in self.rules {
            if rule.keywords.iter().any(|kw| lower.contains(kw)) && !out.contains(&rule.value) {
                out.push(rule.value);
            }
        }
        out
    }

    pub fn rules(&self) -> &'static [KeywordRule<T>] {
        self.rules
    }
}

// Push and pull sit above legs so "push day leg workout" stays a push day.
// Body-part rules come before goal rules, which come before the broad
// audience rules (quick, home, beginner, advanced).
const CATEGORY_RULES: &[KeywordRule<Category>] = &[
    KeywordRule {
        keywords: &[
            "push day",
            "push workout",
            "chest",
            "tricep",
            "push-up",
            "pushup",
            "bench press",
        ],
        value: Category::Push,
    },
    KeywordRule {
        keywords: &[
            "pull day",
            "pull workout",
            "back day",
            "bicep",
            "pull-up",
            "pullup",
            "chin-up",
            "rows",
        ],
        value: Category::Pull,
    },
    KeywordRule {
        keywords: &["leg", "squat", "glute", "quad", "hamstring", "calves"],
        value: Category::Legs,
    },
    KeywordRule {
        keywords: &["core", "abs", "plank", "six pack", "oblique"],
        value: Category::Core,
    },
    KeywordRule {
        keywords: &["hiit", "interval", "tabata", "circuit"],
        value: Category::Hiit,
    },
    KeywordRule {
        keywords: &["yoga", "vinyasa", "sun salutation"],
        value: Category::Yoga,
    },
    KeywordRule {
        keywords: &["pilates", "reformer"],
        value: Category::Pilates,
    },
    KeywordRule {
        keywords: &["upper body", "upper"],
        value: Category::Upper,
    },
    KeywordRule {
        keywords: &["lower body", "lower"],
        value: Category::Lower,
    },
    KeywordRule {
        keywords: &["functional", "athletic", "everyday movement"],
        value: Category::Functional,
    },
    KeywordRule {
        keywords: &["strength", "strong", "muscle", "powerlifting", "weights", "hypertrophy"],
        value: Category::Strength,
    },
    KeywordRule {
        keywords: &["cardio", "run", "jog", "endurance", "stamina", "cycling"],
        value: Category::Cardio,
    },
    KeywordRule {
        keywords: &["fat loss", "lose weight", "weight loss", "burn fat", "fat burn", "lean"],
        value: Category::FatLoss,
    },
    KeywordRule {
        keywords: &["flexib", "stretch", "mobility"],
        value: Category::Flexibility,
    },
    KeywordRule {
        keywords: &["quick", "short", "no time", "busy"],
        value: Category::Quick,
    },
    KeywordRule {
        keywords: &["home", "no equipment", "bodyweight", "apartment"],
        value: Category::Home,
    },
    KeywordRule {
        keywords: &["beginner", "new to", "just starting", "first time"],
        value: Category::Beginner,
    },
    KeywordRule {
        keywords: &["advanced", "challenge", "intense", "hardcore"],
        value: Category::Advanced,
    },
];

pub const CATEGORY_TABLE: KeywordTable<Category> = KeywordTable::new(CATEGORY_RULES);

/// Map free text to a workout category. Never fails: misses land on `General`.
pub fn classify(text: &str) -> Category {
    CATEGORY_TABLE.first_match(text).unwrap_or(Category::General)
}

// Values are form-tip file keys. Lunge precedes squat for split squats,
// bench press precedes the generic presses.
const EXERCISE_RULES: &[KeywordRule<&str>] = &[
    KeywordRule {
        keywords: &["deadlift", "rdl"],
        value: "deadlift",
    },
    KeywordRule {
        keywords: &["lunge", "split squat"],
        value: "lunge",
    },
    KeywordRule {
        keywords: &["squat"],
        value: "squat",
    },
    KeywordRule {
        keywords: &["push-up", "pushup", "push up", "press-up"],
        value: "push-up",
    },
    KeywordRule {
        keywords: &["pull-up", "pullup", "pull up", "chin-up", "chinup"],
        value: "pull-up",
    },
    KeywordRule {
        keywords: &["plank"],
        value: "plank",
    },
    KeywordRule {
        keywords: &["bench"],
        value: "bench-press",
    },
    KeywordRule {
        keywords: &["overhead press", "shoulder press", "military press", "ohp"],
        value: "overhead-press",
    },
    KeywordRule {
        keywords: &["row"],
        value: "row",
    },
];

pub const EXERCISE_TABLE: KeywordTable<&str> = KeywordTable::new(EXERCISE_RULES);

const LEVEL_RULES: &[KeywordRule<FitnessLevel>] = &[
    KeywordRule {
        keywords: &["beginner", "new to", "just starting", "first time"],
        value: FitnessLevel::Beginner,
    },
    KeywordRule {
        keywords: &["advanced", "experienced", "intense", "hardcore"],
        value: FitnessLevel::Advanced,
    },
    KeywordRule {
        keywords: &["intermediate"],
        value: FitnessLevel::Intermediate,
    },
];

pub const LEVEL_TABLE: KeywordTable<FitnessLevel> = KeywordTable::new(LEVEL_RULES);

const EQUIPMENT_RULES: &[KeywordRule<&str>] = &[
    KeywordRule {
        keywords: &["dumbbell"],
        value: "dumbbells",
    },
    KeywordRule {
        keywords: &["barbell"],
        value: "barbell",
    },
    KeywordRule {
        keywords: &["kettlebell"],
        value: "kettlebell",
    },
    KeywordRule {
        keywords: &["resistance band", "bands"],
        value: "resistance bands",
    },
    KeywordRule {
        keywords: &["pull-up bar", "pullup bar"],
        value: "pull-up bar",
    },
    KeywordRule {
        keywords: &["jump rope", "skipping rope"],
        value: "jump rope",
    },
    KeywordRule {
        keywords: &["machine", "cable"],
        value: "gym machines",
    },
];

pub const EQUIPMENT_TABLE: KeywordTable<&str> = KeywordTable::new(EQUIPMENT_RULES);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        assert_eq!(classify("push day leg workout"), Category::Push);
        assert_eq!(classify("leg workout after push day"), Category::Push);
        assert_eq!(classify("leg workout"), Category::Legs);
    }

    #[test]
    fn unmatched_is_general() {
        assert_eq!(classify("xyzzy quux"), Category::General);
        assert_eq!(classify(""), Category::General);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(classify("YOGA flow please"), Category::Yoga);
        assert_eq!(classify("Burn Fat fast"), Category::FatLoss);
    }

    #[test]
    fn every_rule_reaches_its_category() {
        // each rule's first keyword must not be shadowed by an earlier rule
        for rule in CATEGORY_TABLE.rules() {
            assert_eq!(classify(rule.keywords[0]), rule.value, "keyword {}", rule.keywords[0]);
        }
    }

    #[test]
    fn all_matches_keeps_table_order() {
        assert_eq!(
            CATEGORY_TABLE.all_matches("quick leg and core"),
            vec![Category::Legs, Category::Core, Category::Quick]
        );
    }

    #[test]
    fn exercise_lookup_prefers_specific_rules() {
        assert_eq!(EXERCISE_TABLE.first_match("Bulgarian split squat"), Some("lunge"));
        assert_eq!(EXERCISE_TABLE.first_match("Squats"), Some("squat"));
        assert_eq!(EXERCISE_TABLE.first_match("Barbell bench press"), Some("bench-press"));
        assert_eq!(EXERCISE_TABLE.first_match("burpee"), None);
    }

    #[test]
    fn equipment_collects_every_hit() {
        assert_eq!(
            EQUIPMENT_TABLE.all_matches("I have a kettlebell and two dumbbells"),
            vec!["dumbbells", "kettlebell"]
        );
        assert_eq!(LEVEL_TABLE.first_match("I'm new to lifting"), Some(FitnessLevel::Beginner));
    }

    #[test]
    fn keys_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_key(category.as_str()), Some(category));
        }
    }
}
