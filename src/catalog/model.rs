use crate::catalog::slug::slugify;
use crate::catalog_enum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

catalog_enum!(
    /// Course-level difficulty.
    DifficultyLevel {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
);

impl DifficultyLevel {
    /// Accepts the item-level aliases (easy/medium/hard) used by older curricula.
    pub fn normalize(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyLevel::Beginner),
            "medium" => Ok(DifficultyLevel::Intermediate),
            "hard" => Ok(DifficultyLevel::Advanced),
            other => other.parse(),
        }
    }
}

catalog_enum!(
    CertificationTrack {
        Docker => "docker",
        Dca => "dca",
        Cka => "cka",
        Ckad => "ckad",
        Cks => "cks",
        Kubernetes => "kubernetes",
        NoTrack => "none",
    }
);

catalog_enum!(
    /// Difficulty of labs, interactive units and quiz questions.
    ItemDifficulty {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
);

catalog_enum!(LabType {
    Docker => "docker",
    Kubernetes => "kubernetes",
    DockerCompose => "docker-compose",
    Helm => "helm",
    Python => "python",
    Golang => "golang",
    Javascript => "javascript",
    Ruby => "ruby",
    Postgresql => "postgresql",
    Networking => "networking",
    Linux => "linux",
    Security => "security",
});

catalog_enum!(LabFormat {
    Terminal => "terminal",
    CodeEditor => "code_editor",
    Hybrid => "hybrid",
});

impl LabFormat {
    pub fn needs_code(&self) -> bool {
        matches!(self, LabFormat::CodeEditor | LabFormat::Hybrid)
    }
}

catalog_enum!(ProgrammingLanguage {
    Python => "python",
    Golang => "golang",
    Javascript => "javascript",
    Ruby => "ruby",
    Java => "java",
    Sql => "sql",
});

catalog_enum!(QuestionType {
    Mcq => "mcq",
    TrueFalse => "true_false",
    Command => "command",
    FillBlank => "fill_blank",
    Numerical => "numerical",
    Equation => "equation",
    Sequence => "sequence",
});

impl QuestionType {
    pub fn normalize(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "multiple_choice" => Ok(QuestionType::Mcq),
            "fill-blank" => Ok(QuestionType::FillBlank),
            other => other.parse(),
        }
    }
}

catalog_enum!(
    /// Stored `module_items.item_type` tag.
    ItemKind {
        CourseLesson => "CourseLesson",
        Quiz => "Quiz",
        InteractiveLearningUnit => "InteractiveLearningUnit",
        HandsOnLab => "HandsOnLab",
    }
);

impl ItemKind {
    /// Short operator-facing label, as typed in commands and manifests.
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::CourseLesson => "lesson",
            ItemKind::Quiz => "quiz",
            ItemKind::InteractiveLearningUnit => "unit",
            ItemKind::HandsOnLab => "lab",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "lesson" | "courselesson" => Some(ItemKind::CourseLesson),
            "quiz" => Some(ItemKind::Quiz),
            "unit" | "interactivelearningunit" => Some(ItemKind::InteractiveLearningUnit),
            "lab" | "handsonlab" => Some(ItemKind::HandsOnLab),
            _ => None,
        }
    }
}

/// Polymorphic reference to one content row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: i32,
}

impl ItemRef {
    pub fn new(kind: ItemKind, id: i32) -> Self {
        Self { kind, id }
    }

    pub fn lesson(id: i32) -> Self {
        Self::new(ItemKind::CourseLesson, id)
    }

    pub fn quiz(id: i32) -> Self {
        Self::new(ItemKind::Quiz, id)
    }

    pub fn unit(id: i32) -> Self {
        Self::new(ItemKind::InteractiveLearningUnit, id)
    }

    pub fn lab(id: i32) -> Self {
        Self::new(ItemKind::HandsOnLab, id)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Existing,
    Updated,
}

/// Result of a find-or-create: the row plus whether it was written.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    Created(T),
    Existing(T),
    Updated(T),
}

impl<T> Upserted<T> {
    pub fn get(&self) -> &T {
        match self {
            Upserted::Created(v) | Upserted::Existing(v) | Upserted::Updated(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(v) | Upserted::Existing(v) | Upserted::Updated(v) => v,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn outcome(&self) -> UpsertOutcome {
        match self {
            Upserted::Created(_) => UpsertOutcome::Created,
            Upserted::Existing(_) => UpsertOutcome::Existing,
            Upserted::Updated(_) => UpsertOutcome::Updated,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_passing_score() -> i32 {
    70
}

fn default_points() -> i32 {
    1
}

fn default_lab_difficulty() -> String {
    ItemDifficulty::Easy.as_str().to_string()
}

fn default_lab_type() -> String {
    LabType::Docker.as_str().to_string()
}

fn default_lab_format() -> String {
    LabFormat::Terminal.as_str().to_string()
}

fn default_lab_minutes() -> i32 {
    30
}

fn default_lab_attempts() -> i32 {
    3
}

fn default_lab_points() -> i32 {
    10
}

fn default_question_type() -> String {
    QuestionType::Mcq.as_str().to_string()
}

fn default_unit_minutes() -> i32 {
    3
}

/// Attributes of a course keyed by `slug`. Enumerated fields stay raw strings
/// until validation so bad curriculum data surfaces as a validation error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseDefinition {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "level")]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<i32>,
    #[serde(default)]
    pub certification_track: Option<String>,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default)]
    pub sequence_order: i32,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl CourseDefinition {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            published: true,
            ..Default::default()
        }
    }
}

/// Attributes of a module keyed by `(course, slug)`; the slug falls back to the
/// slugified title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sequence_order: Option<i32>,
    #[serde(default)]
    pub estimated_minutes: Option<i32>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default = "default_true")]
    pub published: bool,
}

impl ModuleDefinition {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            title: title.into(),
            published: true,
            ..Default::default()
        }
    }

    pub fn at(mut self, sequence_order: i32) -> Self {
        self.sequence_order = Some(sequence_order);
        self
    }

    pub fn natural_slug(&self) -> String {
        match self.slug.as_deref() {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slugify(&self.title),
        }
    }
}

/// Lesson keyed by `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonDefinition {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub reading_time_minutes: Option<i32>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

impl LessonDefinition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    #[serde(default = "default_question_type", alias = "type")]
    pub question_type: String,
    #[serde(alias = "question")]
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Index into `options`; used when `correct_answer` is absent.
    #[serde(default)]
    pub correct_index: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: i32,
    #[serde(default, alias = "difficulty")]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub irt_difficulty: Option<f64>,
    #[serde(default)]
    pub irt_discrimination: Option<f64>,
    #[serde(default)]
    pub irt_guessing: Option<f64>,
}

impl QuestionDefinition {
    pub fn mcq(text: impl Into<String>, options: &[&str], correct_index: usize) -> Self {
        Self {
            question_type: QuestionType::Mcq.as_str().to_string(),
            question_text: text.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index: Some(correct_index),
            points: 1,
            ..Default::default()
        }
    }

    pub fn resolved_answer(&self) -> Option<String> {
        if let Some(answer) = self.correct_answer.as_ref() {
            return Some(answer.clone());
        }
        self.correct_index
            .and_then(|idx| self.options.get(idx))
            .cloned()
    }
}

/// Quiz keyed by `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time_limit_minutes: Option<i32>,
    #[serde(default = "default_passing_score")]
    pub passing_score: i32,
    #[serde(default)]
    pub max_attempts: Option<i32>,
    #[serde(default = "default_true")]
    pub shuffle_questions: bool,
    #[serde(default = "default_true")]
    pub show_correct_answers: bool,
    #[serde(default)]
    pub questions: Vec<QuestionDefinition>,
}

impl QuizDefinition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            passing_score: default_passing_score(),
            shuffle_questions: true,
            show_correct_answers: true,
            ..Default::default()
        }
    }
}

/// Hands-on lab keyed by `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabDefinition {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_lab_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_lab_type")]
    pub lab_type: String,
    #[serde(default = "default_lab_format")]
    pub lab_format: String,
    #[serde(default = "default_lab_minutes")]
    pub estimated_minutes: i32,
    #[serde(default = "default_lab_attempts")]
    pub max_attempts: i32,
    #[serde(default = "default_lab_points")]
    pub points_reward: i32,
    #[serde(default)]
    pub programming_language: Option<String>,
    #[serde(default)]
    pub starter_code: Option<String>,
    #[serde(default)]
    pub solution_code: Option<String>,
    #[serde(default, alias = "tasks")]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub test_cases: Vec<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl LabDefinition {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            description: None,
            difficulty: default_lab_difficulty(),
            lab_type: default_lab_type(),
            lab_format: default_lab_format(),
            estimated_minutes: default_lab_minutes(),
            max_attempts: default_lab_attempts(),
            points_reward: default_lab_points(),
            programming_language: None,
            starter_code: None,
            solution_code: None,
            steps: Vec::new(),
            test_cases: Vec::new(),
            category: None,
            is_active: true,
        }
    }
}

/// Interactive learning unit keyed by `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub concept_explanation: String,
    #[serde(default)]
    pub command_to_learn: Option<String>,
    #[serde(default)]
    pub command_variations: Vec<String>,
    #[serde(default)]
    pub practice_hints: Vec<String>,
    #[serde(default = "default_lab_difficulty")]
    pub difficulty_level: String,
    #[serde(default = "default_unit_minutes")]
    pub estimated_minutes: i32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub published: bool,
}

impl UnitDefinition {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            concept_explanation: String::new(),
            command_to_learn: None,
            command_variations: Vec::new(),
            practice_hints: Vec::new(),
            difficulty_level: default_lab_difficulty(),
            estimated_minutes: default_unit_minutes(),
            category: None,
            published: true,
        }
    }
}
