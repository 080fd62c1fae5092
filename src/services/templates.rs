// src/services/templates.rs
//! Template store and parameter substitution.
//!
//! Template text lives in `templates/` and is compiled into the binary. A
//! directory given at startup can override any file by relative path. Each
//! body is compiled once into literal and slot segments, so rendering is a
//! single pass with no parsing.
//!
//! Workout template layout:
//!
//! ```text
//! [beginner]
//! reps = 8-12
//! [intermediate]
//! reps = 6-10
//! [advanced]
//! reps = 4-6
//! ---
//! {{level}} STRENGTH WORKOUT ({{total}} min)
//! MAIN WORKOUT ({{main}} min)
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info};

use super::classifier::Category;
use super::fallback::FallbackKind;
use super::models::FitnessLevel;
use crate::error::TemplateError;

macro_rules! embed {
    ($($path:literal),* $(,)?) => {
        &[$(($path, include_str!(concat!("../../templates/", $path)))),*]
    };
}

const EMBEDDED: &[(&str, &str)] = embed![
    "workouts/push.txt",
    "workouts/pull.txt",
    "workouts/legs.txt",
    "workouts/core.txt",
    "workouts/hiit.txt",
    "workouts/yoga.txt",
    "workouts/pilates.txt",
    "workouts/upper.txt",
    "workouts/lower.txt",
    "workouts/functional.txt",
    "workouts/strength.txt",
    "workouts/cardio.txt",
    "workouts/fat-loss.txt",
    "workouts/flexibility.txt",
    "workouts/quick.txt",
    "workouts/home.txt",
    "workouts/beginner.txt",
    "workouts/advanced.txt",
    "workouts/general.txt",
    "form/squat.txt",
    "form/deadlift.txt",
    "form/push-up.txt",
    "form/pull-up.txt",
    "form/plank.txt",
    "form/lunge.txt",
    "form/bench-press.txt",
    "form/overhead-press.txt",
    "form/row.txt",
    "form/general.txt",
    "fallback/workout.txt",
    "fallback/form.txt",
    "fallback/warm-up.txt",
    "fallback/greeting.txt",
];

/// Exercise keys that have a form-tip file. `general` is the catch-all.
pub const FORM_TIP_KEYS: &[&str] = &[
    "squat",
    "deadlift",
    "push-up",
    "pull-up",
    "plank",
    "lunge",
    "bench-press",
    "overhead-press",
    "row",
    "general",
];

/// Warm-up, main block and cool-down minutes for one session length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSplit {
    pub total: u32,
    pub warmup: u32,
    pub cooldown: u32,
    pub main: u32,
    pub block_a: u32,
    pub block_b: u32,
}

impl TimeSplit {
    pub const MIN_TOTAL: u32 = 5;
    pub const MAX_TOTAL: u32 = 180;

    pub fn for_total(minutes: u32) -> Self {
        let total = minutes.clamp(Self::MIN_TOTAL, Self::MAX_TOTAL);
        let edge = if total >= 20 {
            5
        } else if total >= 10 {
            3
        } else {
            1
        };
        let main = total - 2 * edge;
        Self {
            total,
            warmup: edge,
            cooldown: edge,
            main,
            block_a: main - main / 2,
            block_b: main / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Total,
    Warmup,
    Cooldown,
    Main,
    BlockA,
    BlockB,
    Equipment,
    Level,
    Exercise,
}

impl Builtin {
    fn parse(name: &str) -> Option<Builtin> {
        Some(match name {
            "total" => Builtin::Total,
            "warmup" => Builtin::Warmup,
            "cooldown" => Builtin::Cooldown,
            "main" => Builtin::Main,
            "block_a" => Builtin::BlockA,
            "block_b" => Builtin::BlockB,
            "equipment" => Builtin::Equipment,
            "level" => Builtin::Level,
            "exercise" => Builtin::Exercise,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Builtin(Builtin),
    Param(String),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

#[derive(Debug, Clone)]
struct CompiledText {
    segments: Vec<Segment>,
}

impl CompiledText {
    fn compile(
        file: &str,
        body: &str,
        resolve: impl Fn(&str) -> Option<Slot>,
    ) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = body;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| TemplateError::UnterminatedPlaceholder {
                    file: file.to_string(),
                })?;
            let name = after[..end].trim();
            let slot = resolve(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                file: file.to_string(),
                name: name.to_string(),
            })?;
            segments.push(Segment::Slot(slot));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    fn has_slot(&self, wanted: &Slot) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Slot(slot) if slot == wanted))
    }

    fn render(&self, mut value: impl FnMut(&Slot) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&value(slot)),
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
struct WorkoutTemplate {
    body: CompiledText,
    params: BTreeMap<FitnessLevel, BTreeMap<String, String>>,
}

impl WorkoutTemplate {
    fn parse(file: &str, contents: &str) -> Result<Self, TemplateError> {
        let (header, body) = split_header(file, contents)?;

        let mut params: BTreeMap<FitnessLevel, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<FitnessLevel> = None;
        for (idx, line) in header.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(section) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                let level = section
                    .parse::<FitnessLevel>()
                    .map_err(|_| TemplateError::UnknownSection {
                        file: file.to_string(),
                        section: section.to_string(),
                    })?;
                params.entry(level).or_default();
                current = Some(level);
                continue;
            }
            match (current, trimmed.split_once('=')) {
                (Some(level), Some((key, value))) if !key.trim().is_empty() => {
                    params
                        .entry(level)
                        .or_default()
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => {
                    return Err(TemplateError::MalformedLine {
                        file: file.to_string(),
                        line: idx + 1,
                        text: trimmed.to_string(),
                    });
                }
            }
        }

        for level in FitnessLevel::ALL {
            if !params.contains_key(&level) {
                return Err(TemplateError::MissingLevel {
                    file: file.to_string(),
                    level: level.to_string(),
                });
            }
        }

        // A key is usable only when every level defines it.
        let shared: BTreeSet<String> = params
            .values()
            .map(|p| p.keys().cloned().collect::<BTreeSet<_>>())
            .reduce(|a, b| a.intersection(&b).cloned().collect())
            .unwrap_or_default();

        let body = CompiledText::compile(file, &body, |name| match Builtin::parse(name) {
            Some(Builtin::Exercise) => None,
            Some(b) => Some(Slot::Builtin(b)),
            None if shared.contains(name) => Some(Slot::Param(name.to_string())),
            None => None,
        })?;

        if !body.has_slot(&Slot::Builtin(Builtin::Main)) {
            return Err(TemplateError::MissingMainBlock {
                file: file.to_string(),
            });
        }

        Ok(Self { body, params })
    }

    fn render(&self, level: FitnessLevel, split: TimeSplit, equipment: &str) -> String {
        let params = self.params.get(&level);
        self.body.render(|slot| match slot {
            Slot::Builtin(Builtin::Total) => split.total.to_string(),
            Slot::Builtin(Builtin::Warmup) => split.warmup.to_string(),
            Slot::Builtin(Builtin::Cooldown) => split.cooldown.to_string(),
            Slot::Builtin(Builtin::Main) => split.main.to_string(),
            Slot::Builtin(Builtin::BlockA) => split.block_a.to_string(),
            Slot::Builtin(Builtin::BlockB) => split.block_b.to_string(),
            Slot::Builtin(Builtin::Equipment) => equipment.to_string(),
            Slot::Builtin(Builtin::Level) => level.label().to_string(),
            Slot::Builtin(Builtin::Exercise) => String::new(),
            Slot::Param(key) => params
                .and_then(|p| p.get(key))
                .cloned()
                .unwrap_or_default(),
        })
    }
}

fn split_header(file: &str, contents: &str) -> Result<(Vec<String>, String), TemplateError> {
    let lines: Vec<&str> = contents.lines().collect();
    let sep = lines
        .iter()
        .position(|l| l.trim() == "---")
        .ok_or_else(|| TemplateError::MissingBody {
            file: file.to_string(),
        })?;
    let header = lines[..sep].iter().map(|l| l.to_string()).collect();
    let body = lines[sep + 1..].join("\n").trim().to_string();
    Ok((header, body))
}

/// All compiled template text, keyed for lookup.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    workouts: HashMap<Category, WorkoutTemplate>,
    form_tips: HashMap<&'static str, CompiledText>,
    fallbacks: HashMap<FallbackKind, String>,
}

impl TemplateStore {
    /// Store built from the compiled-in files only.
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::load(None)
    }

    /// Compiled-in files, with any same-named file under `override_dir`
    /// taking precedence.
    pub fn load(override_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut sources: HashMap<&'static str, String> = EMBEDDED
            .iter()
            .map(|(name, text)| (*name, (*text).to_string()))
            .collect();

        if let Some(dir) = override_dir {
            for &(name, _) in EMBEDDED {
                let path = dir.join(name);
                if path.is_file() {
                    let text = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                    debug!(file = %name, path = %path.display(), "template overridden");
                    sources.insert(name, text);
                }
            }
        }

        Self::from_sources(&sources)
    }

    fn from_sources(sources: &HashMap<&'static str, String>) -> Result<Self, TemplateError> {
        let source = |name: String| match sources.get(name.as_str()) {
            Some(text) => Ok((name, text)),
            None => Err(TemplateError::MissingTemplate(name)),
        };

        let mut workouts = HashMap::new();
        for category in Category::ALL {
            let (file, text) = source(format!("workouts/{}.txt", category.as_str()))?;
            workouts.insert(category, WorkoutTemplate::parse(&file, text)?);
        }

        let mut form_tips = HashMap::new();
        for key in FORM_TIP_KEYS {
            let (file, text) = source(format!("form/{key}.txt"))?;
            let compiled =
                CompiledText::compile(&file, text.trim(), |name| match Builtin::parse(name) {
                    Some(Builtin::Exercise) => Some(Slot::Builtin(Builtin::Exercise)),
                    _ => None,
                })?;
            form_tips.insert(*key, compiled);
        }

        let mut fallbacks = HashMap::new();
        for kind in FallbackKind::ALL {
            let (_, text) = source(format!("fallback/{}.txt", kind.as_str()))?;
            fallbacks.insert(kind, text.trim().to_string());
        }

        info!(
            workouts = workouts.len(),
            form_tips = form_tips.len(),
            fallbacks = fallbacks.len(),
            "templates loaded"
        );
        Ok(Self {
            workouts,
            form_tips,
            fallbacks,
        })
    }

    /// Render a full workout. Pure: identical arguments give identical text.
    pub fn render_workout(
        &self,
        category: Category,
        level: FitnessLevel,
        minutes: u32,
        equipment: &str,
    ) -> String {
        match self.workouts.get(&category) {
            Some(template) => template.render(level, TimeSplit::for_total(minutes), equipment),
            None => self.fallback(FallbackKind::Workout).to_string(),
        }
    }

    /// Form tips for a known exercise key; unknown keys use `general`.
    pub fn render_form_tips(&self, key: &str, exercise: &str) -> String {
        let template = self
            .form_tips
            .get(key)
            .or_else(|| self.form_tips.get("general"));
        match template {
            Some(t) => t.render(|_| exercise.to_string()),
            None => self.fallback(FallbackKind::Form).to_string(),
        }
    }

    pub fn fallback(&self, kind: FallbackKind) -> &str {
        self.fallbacks.get(&kind).map(String::as_str).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::EXERCISE_TABLE;

    fn sources_with(name: &'static str, text: &str) -> HashMap<&'static str, String> {
        let mut sources: HashMap<&'static str, String> = EMBEDDED
            .iter()
            .map(|(n, t)| (*n, (*t).to_string()))
            .collect();
        sources.insert(name, text.to_string());
        sources
    }

    #[test]
    fn split_uses_five_minute_edges_for_long_sessions() {
        let split = TimeSplit::for_total(45);
        assert_eq!((split.warmup, split.main, split.cooldown), (5, 35, 5));
        assert_eq!(split.block_a + split.block_b, split.main);
        assert_eq!(split.block_a, 18);
    }

    #[test]
    fn split_shrinks_edges_for_short_sessions() {
        assert_eq!(TimeSplit::for_total(10).main, 4);
        assert_eq!(TimeSplit::for_total(7).main, 5);
        assert_eq!(TimeSplit::for_total(0).total, TimeSplit::MIN_TOTAL);
        assert_eq!(TimeSplit::for_total(1000).total, TimeSplit::MAX_TOTAL);
    }

    #[test]
    fn every_embedded_template_compiles() {
        let store = TemplateStore::embedded().unwrap();
        assert_eq!(store.workouts.len(), Category::ALL.len());
        assert_eq!(store.form_tips.len(), FORM_TIP_KEYS.len());
        for kind in FallbackKind::ALL {
            assert!(!store.fallback(kind).is_empty());
        }
    }

    #[test]
    fn no_placeholder_survives_rendering() {
        let store = TemplateStore::embedded().unwrap();
        for category in Category::ALL {
            for level in FitnessLevel::ALL {
                let text = store.render_workout(category, level, 40, "dumbbells");
                assert!(!text.contains("{{"), "{category}/{level} left a placeholder");
                assert!(text.contains(level.label()), "{category}/{level} lost its level");
            }
        }
        for key in FORM_TIP_KEYS {
            assert!(!store.render_form_tips(key, "Squats").contains("{{"));
        }
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let text = "[beginner]\nreps = 1\n[intermediate]\nreps = 2\n[advanced]\nreps = 3\n---\n\
                    MAIN WORKOUT ({{main}} min) {{tempo}}";
        let err =
            TemplateStore::from_sources(&sources_with("workouts/core.txt", text)).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownPlaceholder { ref name, .. } if name == "tempo"
        ));
    }

    #[test]
    fn param_missing_from_one_level_is_unknown() {
        let text = "[beginner]\nreps = 1\n[intermediate]\nreps = 2\n[advanced]\nsets = 3\n---\n\
                    MAIN WORKOUT ({{main}} min) {{reps}}";
        assert!(TemplateStore::from_sources(&sources_with("workouts/core.txt", text)).is_err());
    }

    #[test]
    fn missing_level_and_main_block_are_rejected() {
        let no_adv = "[beginner]\n[intermediate]\n---\nMAIN WORKOUT ({{main}} min)";
        assert!(matches!(
            TemplateStore::from_sources(&sources_with("workouts/yoga.txt", no_adv)),
            Err(TemplateError::MissingLevel { .. })
        ));
        let no_main = "[beginner]\n[intermediate]\n[advanced]\n---\n{{total}} minutes";
        assert!(matches!(
            TemplateStore::from_sources(&sources_with("workouts/yoga.txt", no_main)),
            Err(TemplateError::MissingMainBlock { .. })
        ));
        let open =
            "[beginner]\n[intermediate]\n[advanced]\n---\nMAIN WORKOUT ({{main}} min) {{level";
        assert!(matches!(
            TemplateStore::from_sources(&sources_with("workouts/yoga.txt", open)),
            Err(TemplateError::UnterminatedPlaceholder { .. })
        ));
    }

    #[test]
    fn override_dir_replaces_embedded_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("workouts")).unwrap();
        std::fs::write(
            dir.path().join("workouts/yoga.txt"),
            "[beginner]\npose = child\n[intermediate]\npose = crow\n[advanced]\npose = firefly\n\
             ---\nCUSTOM {{pose}}\nMAIN WORKOUT ({{main}} min)",
        )
        .unwrap();
        let store = TemplateStore::load(Some(dir.path())).unwrap();
        let text = store.render_workout(Category::Yoga, FitnessLevel::Advanced, 30, "mat");
        assert_eq!(text, "CUSTOM firefly\nMAIN WORKOUT (20 min)");
        // untouched files still come from the binary
        let push = store.render_workout(Category::Push, FitnessLevel::Advanced, 30, "mat");
        assert!(push.contains("PUSH"));
    }

    #[test]
    fn every_exercise_key_has_tips() {
        for rule in EXERCISE_TABLE.rules() {
            assert!(FORM_TIP_KEYS.contains(&rule.value), "no form file for {}", rule.value);
        }
    }

    #[test]
    fn unknown_form_key_uses_general() {
        let store = TemplateStore::embedded().unwrap();
        let text = store.render_form_tips("handstand", "Handstand");
        assert!(text.contains("Handstand"));
    }
}
