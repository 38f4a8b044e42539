use crate::catalog::model::ItemKind;
use crate::catalog::validation::{
    validate_course, validate_lab, validate_lesson, validate_module, validate_quiz, validate_unit,
};
use crate::seed::manifest::Manifest;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, at: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", at, message));
    }

    fn warning(&mut self, at: &str, message: impl std::fmt::Display) {
        self.warnings.push(format!("{}: {}", at, message));
    }
}

/// 在写库之前检查整份清单，收集全部错误而不是遇到第一个就停下
pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Err(e) = validate_course(&manifest.course) {
        report.error("course", e);
    }
    if manifest.course.description.is_none() {
        report.warning("course", "no description");
    }
    if manifest.modules.is_empty() {
        report.warning("course", "no modules");
    }

    let mut slugs = HashSet::new();
    let mut positions = HashSet::new();
    for (i, m) in manifest.modules.iter().enumerate() {
        let at = format!("modules[{}]", i);
        if let Err(e) = validate_module(&m.module) {
            report.error(&at, e);
        }
        let slug = m.module.natural_slug();
        if !slugs.insert(slug.clone()) {
            report.error(&at, format!("duplicate module slug '{}'", slug));
        }
        if let Some(n) = m.module.sequence_order {
            if !positions.insert(n) {
                report.warning(&at, format!("sequence_order {} used twice", n));
            }
        }
        if m.item_count() == 0 {
            report.warning(&at, "module has no items");
        }

        for (j, lesson) in m.course_lessons.iter().enumerate() {
            let at = format!("{}.course_lessons[{}]", at, j);
            if let Err(e) = validate_lesson(&lesson.def) {
                report.error(&at, e);
            }
            if lesson.def.content.as_deref().map_or(true, |c| c.trim().is_empty()) {
                report.warning(&at, format!("lesson '{}' has no content", lesson.def.title));
            }
        }
        for (j, unit) in m.units.iter().enumerate() {
            if let Err(e) = validate_unit(&unit.def) {
                report.error(&format!("{}.units[{}]", at, j), e);
            }
        }
        for (j, lab) in m.labs.iter().enumerate() {
            let at = format!("{}.labs[{}]", at, j);
            if let Err(e) = validate_lab(&lab.def) {
                report.error(&at, e);
            }
            if lab.def.steps.is_empty() {
                report.warning(&at, format!("lab '{}' has no steps", lab.def.slug));
            }
        }
        for (j, quiz) in m.quizzes.iter().enumerate() {
            let at = format!("{}.quizzes[{}]", at, j);
            if let Err(e) = validate_quiz(&quiz.def) {
                report.error(&at, e);
            }
            if quiz.def.questions.is_empty() {
                report.warning(&at, format!("quiz '{}' has no questions", quiz.def.title));
            }
        }
        for (j, link) in m.shared.iter().enumerate() {
            let at = format!("{}.shared[{}]", at, j);
            if ItemKind::from_label(&link.kind).is_none() {
                report.error(
                    &at,
                    format!("unknown kind '{}' (lesson, quiz, unit, lab)", link.kind),
                );
            }
            if link.key.trim().is_empty() {
                report.error(&at, "key can't be blank");
            }
        }

        let placed = m
            .course_lessons
            .iter()
            .map(|p| p.sequence_order)
            .chain(m.units.iter().map(|p| p.sequence_order))
            .chain(m.labs.iter().map(|p| p.sequence_order))
            .chain(m.quizzes.iter().map(|p| p.sequence_order))
            .chain(m.shared.iter().map(|p| p.sequence_order));
        for n in placed.flatten() {
            if n < 1 {
                report.error(&at, format!("item sequence_order {} must be >= 1", n));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{
        CourseDefinition, LabDefinition, LessonDefinition, ModuleDefinition, QuestionDefinition,
        QuizDefinition,
    };
    use crate::seed::manifest::{ManifestModule, Placed, SharedLink};

    fn manifest() -> Manifest {
        let mut course = CourseDefinition::new("docker-fundamentals", "Docker Fundamentals");
        course.description = Some("Containers from zero".to_string());
        let mut lesson = LessonDefinition::new("What is Docker?");
        lesson.content = Some("Docker packages apps".to_string());
        let mut quiz = QuizDefinition::new("Docker Quiz");
        quiz.questions = vec![QuestionDefinition::mcq("Q?", &["a", "b"], 0)];
        let mut lab = LabDefinition::new("first-container", "First Container");
        lab.steps = vec![serde_json::json!("docker run hello-world")];
        Manifest {
            course,
            modules: vec![ManifestModule {
                module: ModuleDefinition::new("intro", "Intro").at(1),
                course_lessons: vec![Placed::new(lesson)],
                quizzes: vec![Placed::new(quiz)],
                labs: vec![Placed::new(lab)],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn clean_manifest_has_no_findings() {
        let report = validate_manifest(&manifest());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn collects_every_error() {
        let mut m = manifest();
        m.course.certification_track = Some("python".to_string());
        m.modules[0].labs[0].def.lab_type = "cobol".to_string();
        m.modules.push(ManifestModule {
            module: ModuleDefinition::new("intro", "Intro again"),
            shared: vec![SharedLink {
                kind: "video".to_string(),
                key: "x".to_string(),
                sequence_order: Some(0),
                required: true,
            }],
            ..Default::default()
        });

        let report = validate_manifest(&m);
        assert!(!report.is_valid());
        let all = report.errors.join("\n");
        assert!(all.contains("course: "));
        assert!(all.contains("certification_track"));
        assert!(all.contains("modules[0].labs[0]"));
        assert!(all.contains("duplicate module slug 'intro'"));
        assert!(all.contains("unknown kind 'video'"));
        assert!(all.contains("must be >= 1"));
    }

    #[test]
    fn warns_about_thin_content() {
        let mut m = manifest();
        m.modules[0].course_lessons[0].def.content = None;
        m.modules.push(ManifestModule {
            module: ModuleDefinition::new("empty", "Empty"),
            ..Default::default()
        });
        let report = validate_manifest(&m);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("has no content"));
        assert!(report.warnings[1].contains("no items"));
    }
}
