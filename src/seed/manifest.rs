use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{
    CourseDefinition, LabDefinition, LessonDefinition, ModuleDefinition, QuizDefinition,
    UnitDefinition,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_required() -> bool {
    true
}

/// A content definition together with its placement inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placed<T> {
    #[serde(flatten)]
    pub def: T,
    /// Position within the module; appended when absent.
    #[serde(default)]
    pub sequence_order: Option<i32>,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl<T> Placed<T> {
    pub fn new(def: T) -> Self {
        Self {
            def,
            sequence_order: None,
            required: true,
        }
    }

    pub fn at(mut self, sequence_order: i32) -> Self {
        self.sequence_order = Some(sequence_order);
        self
    }
}

/// Link to content that already exists, by kind label and natural key
/// (title for lessons and quizzes, slug for labs and units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLink {
    pub kind: String,
    pub key: String,
    #[serde(default)]
    pub sequence_order: Option<i32>,
    #[serde(default = "default_required")]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestModule {
    #[serde(flatten)]
    pub module: ModuleDefinition,
    #[serde(default, alias = "lessons")]
    pub course_lessons: Vec<Placed<LessonDefinition>>,
    #[serde(default, alias = "interactive_units")]
    pub units: Vec<Placed<UnitDefinition>>,
    #[serde(default)]
    pub labs: Vec<Placed<LabDefinition>>,
    #[serde(default)]
    pub quizzes: Vec<Placed<QuizDefinition>>,
    #[serde(default)]
    pub shared: Vec<SharedLink>,
}

impl ManifestModule {
    pub fn item_count(&self) -> usize {
        self.course_lessons.len()
            + self.units.len()
            + self.labs.len()
            + self.quizzes.len()
            + self.shared.len()
    }
}

/// One curriculum file: a course and its modules in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub course: CourseDefinition,
    #[serde(default)]
    pub modules: Vec<ManifestModule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yml") | Some("yaml") => Some(ManifestFormat::Yaml),
            Some("json") => Some(ManifestFormat::Json),
            _ => None,
        }
    }
}

impl Manifest {
    pub fn parse(text: &str, format: ManifestFormat) -> CatalogResult<Self> {
        Ok(match format {
            ManifestFormat::Yaml => serde_yaml::from_str(text)?,
            ManifestFormat::Json => serde_json::from_str(text)?,
        })
    }

    pub fn load(path: &Path) -> CatalogResult<Self> {
        let format = ManifestFormat::from_path(path).ok_or_else(|| {
            CatalogError::Manifest(format!("unsupported manifest extension: {}", path.display()))
        })?;
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, format)
    }
}

/// 递归收集目录下的清单文件，按路径排序保证加载顺序稳定
pub fn discover_manifests(dir: &Path) -> CatalogResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CatalogError::Manifest(format!(
            "not a directory: {}",
            dir.display()
        )));
    }
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if ManifestFormat::from_path(&path).is_some() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER_YAML: &str = r##"
course:
  slug: docker-fundamentals
  title: Docker Fundamentals
  level: beginner
  certification_track: docker
  learning_objectives:
    - Run containers
modules:
  - slug: containers
    title: Containers
    sequence_order: 1
    lessons:
      - title: What is a Container?
        content: "# Containers"
        sequence_order: 1
    labs:
      - slug: first-container
        title: Run Your First Container
        required: false
        steps:
          - title: docker run hello-world
    quizzes:
      - title: Containers Quiz
        passing_score: 80
        questions:
          - question: What does docker ps list?
            options: [Images, Containers]
            correct_index: 1
            irt_difficulty: 1
    shared:
      - kind: unit
        key: docker-run
"##;

    #[test]
    fn parses_yaml_manifest_with_aliases() {
        let m = Manifest::parse(DOCKER_YAML, ManifestFormat::Yaml).unwrap();
        assert_eq!(m.course.difficulty_level.as_deref(), Some("beginner"));
        assert!(m.course.published);

        let module = &m.modules[0];
        assert_eq!(module.module.sequence_order, Some(1));
        assert_eq!(module.course_lessons[0].sequence_order, Some(1));
        assert_eq!(module.course_lessons[0].def.title, "What is a Container?");
        assert_eq!(module.course_lessons[0].def.content.as_deref(), Some("# Containers"));
        assert!(!module.labs[0].required);
        assert_eq!(module.labs[0].def.steps.len(), 1);
        assert_eq!(module.labs[0].def.lab_type, "docker");
        let question = &module.quizzes[0].def.questions[0];
        assert_eq!(question.resolved_answer().as_deref(), Some("Containers"));
        assert_eq!(question.irt_difficulty, Some(1.0));
        assert_eq!(module.shared[0].kind, "unit");
        assert_eq!(module.item_count(), 4);
    }

    #[test]
    fn parses_json_manifest() {
        let json = r#"{"course": {"slug": "go-basics", "title": "Go Basics"},
                       "modules": [{"title": "Syntax", "units": [{"slug": "go-run", "title": "go run"}]}]}"#;
        let m = Manifest::parse(json, ManifestFormat::Json).unwrap();
        assert_eq!(m.modules[0].module.natural_slug(), "syntax");
        assert_eq!(m.modules[0].units[0].def.estimated_minutes, 3);
        assert!(m.modules[0].units[0].required);
    }

    #[test]
    fn discovers_manifests_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.yml"), DOCKER_YAML).unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("nested/c.yaml"), DOCKER_YAML).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let found = discover_manifests(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.yml", "nested/c.yaml"]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = Manifest::load(Path::new("course.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Manifest(_)));
    }
}
