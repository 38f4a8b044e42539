use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{
    CertificationTrack, CourseDefinition, DifficultyLevel, ItemDifficulty, LabDefinition,
    LabFormat, LabType, LessonDefinition, ModuleDefinition, ProgrammingLanguage,
    QuestionDefinition, QuestionType, QuizDefinition, UnitDefinition,
};
use crate::catalog::slug::is_valid_slug;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCourse {
    pub difficulty_level: Option<DifficultyLevel>,
    pub certification_track: Option<CertificationTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidLab {
    pub difficulty: ItemDifficulty,
    pub lab_type: LabType,
    pub lab_format: LabFormat,
    pub programming_language: Option<ProgrammingLanguage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuestion {
    pub question_type: QuestionType,
    pub difficulty_level: Option<ItemDifficulty>,
    pub correct_answer: Option<String>,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn non_blank(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn require_slug(entity: &'static str, slug: &str) -> CatalogResult<()> {
    if !is_valid_slug(slug) {
        return Err(CatalogError::validation(
            entity,
            "slug",
            format!("'{}' must be lowercase words joined by single hyphens", slug),
        ));
    }
    Ok(())
}

fn require_title(entity: &'static str, title: &str) -> CatalogResult<()> {
    if blank(title) {
        return Err(CatalogError::validation(entity, "title", "can't be blank"));
    }
    Ok(())
}

fn parse_field<T>(
    entity: &'static str,
    field: &'static str,
    parsed: Result<T, String>,
) -> CatalogResult<T> {
    parsed.map_err(|msg| CatalogError::validation(entity, field, msg))
}

pub fn validate_course(def: &CourseDefinition) -> CatalogResult<ValidCourse> {
    require_slug("course", &def.slug)?;
    require_title("course", &def.title)?;

    let difficulty_level = match non_blank(&def.difficulty_level) {
        Some(raw) => Some(parse_field(
            "course",
            "difficulty_level",
            DifficultyLevel::normalize(raw),
        )?),
        None => None,
    };
    let certification_track = match non_blank(&def.certification_track) {
        Some(raw) => Some(parse_field(
            "course",
            "certification_track",
            raw.parse::<CertificationTrack>(),
        )?),
        None => None,
    };
    if matches!(def.estimated_hours, Some(h) if h < 0) {
        return Err(CatalogError::validation(
            "course",
            "estimated_hours",
            "must be greater than or equal to 0",
        ));
    }

    Ok(ValidCourse {
        difficulty_level,
        certification_track,
    })
}

/// Clears a certification track outside the allow-list. Returns whether the
/// definition changed.
pub fn repair_certification_track(def: &mut CourseDefinition) -> bool {
    match non_blank(&def.certification_track) {
        Some(raw) if raw.parse::<CertificationTrack>().is_err() => {
            def.certification_track = None;
            true
        }
        _ => false,
    }
}

pub fn validate_module(def: &ModuleDefinition) -> CatalogResult<()> {
    require_title("course_module", &def.title)?;
    require_slug("course_module", &def.natural_slug())?;
    if matches!(def.sequence_order, Some(n) if n < 1) {
        return Err(CatalogError::validation(
            "course_module",
            "sequence_order",
            "must be greater than or equal to 1",
        ));
    }
    if matches!(def.estimated_minutes, Some(m) if m < 0) {
        return Err(CatalogError::validation(
            "course_module",
            "estimated_minutes",
            "must be greater than or equal to 0",
        ));
    }
    Ok(())
}

pub fn validate_lesson(def: &LessonDefinition) -> CatalogResult<()> {
    require_title("course_lesson", &def.title)?;
    if matches!(def.reading_time_minutes, Some(m) if m < 0) {
        return Err(CatalogError::validation(
            "course_lesson",
            "reading_time_minutes",
            "must be greater than or equal to 0",
        ));
    }
    Ok(())
}

pub fn validate_question(def: &QuestionDefinition) -> CatalogResult<ValidQuestion> {
    let question_type = parse_field(
        "quiz_question",
        "question_type",
        QuestionType::normalize(&def.question_type),
    )?;
    if blank(&def.question_text) {
        return Err(CatalogError::validation(
            "quiz_question",
            "question_text",
            "can't be blank",
        ));
    }

    let correct_answer = def.resolved_answer();
    if question_type == QuestionType::Mcq {
        if def.options.len() < 2 {
            return Err(CatalogError::validation(
                "quiz_question",
                "options",
                "multiple choice needs at least 2 options",
            ));
        }
        match correct_answer.as_ref() {
            Some(answer) if def.options.contains(answer) => {}
            Some(answer) => {
                return Err(CatalogError::validation(
                    "quiz_question",
                    "correct_answer",
                    format!("'{}' is not one of the options", answer),
                ))
            }
            None => {
                return Err(CatalogError::validation(
                    "quiz_question",
                    "correct_answer",
                    "missing or out-of-range correct option",
                ))
            }
        }
    }

    let difficulty_level = match non_blank(&def.difficulty_level) {
        Some(raw) => Some(parse_field(
            "quiz_question",
            "difficulty_level",
            raw.parse::<ItemDifficulty>(),
        )?),
        None => None,
    };
    if matches!(def.irt_guessing, Some(g) if !(0.0..=1.0).contains(&g)) {
        return Err(CatalogError::validation(
            "quiz_question",
            "irt_guessing",
            "must be between 0 and 1",
        ));
    }
    if def.points < 0 {
        return Err(CatalogError::validation(
            "quiz_question",
            "points",
            "must be greater than or equal to 0",
        ));
    }

    Ok(ValidQuestion {
        question_type,
        difficulty_level,
        correct_answer,
    })
}

pub fn validate_quiz(def: &QuizDefinition) -> CatalogResult<Vec<ValidQuestion>> {
    require_title("quiz", &def.title)?;
    if !(0..=100).contains(&def.passing_score) {
        return Err(CatalogError::validation(
            "quiz",
            "passing_score",
            "must be between 0 and 100",
        ));
    }
    def.questions.iter().map(validate_question).collect()
}

pub fn validate_lab(def: &LabDefinition) -> CatalogResult<ValidLab> {
    require_slug("hands_on_lab", &def.slug)?;
    require_title("hands_on_lab", &def.title)?;
    let difficulty = parse_field("hands_on_lab", "difficulty", def.difficulty.parse())?;
    let lab_type = parse_field("hands_on_lab", "lab_type", def.lab_type.parse())?;
    let lab_format: LabFormat = parse_field("hands_on_lab", "lab_format", def.lab_format.parse())?;

    if def.estimated_minutes <= 0 {
        return Err(CatalogError::validation(
            "hands_on_lab",
            "estimated_minutes",
            "must be greater than 0",
        ));
    }
    if def.max_attempts <= 0 {
        return Err(CatalogError::validation(
            "hands_on_lab",
            "max_attempts",
            "must be greater than 0",
        ));
    }
    if def.points_reward < 0 {
        return Err(CatalogError::validation(
            "hands_on_lab",
            "points_reward",
            "must be greater than or equal to 0",
        ));
    }

    let programming_language = match non_blank(&def.programming_language) {
        Some(raw) => Some(parse_field(
            "hands_on_lab",
            "programming_language",
            raw.parse::<ProgrammingLanguage>(),
        )?),
        None => None,
    };
    if lab_format.needs_code() {
        if programming_language.is_none() {
            return Err(CatalogError::validation(
                "hands_on_lab",
                "programming_language",
                format!("required for {} labs", lab_format),
            ));
        }
        if non_blank(&def.starter_code).is_none() {
            return Err(CatalogError::validation(
                "hands_on_lab",
                "starter_code",
                format!("required for {} labs", lab_format),
            ));
        }
    }

    Ok(ValidLab {
        difficulty,
        lab_type,
        lab_format,
        programming_language,
    })
}

pub fn validate_unit(def: &UnitDefinition) -> CatalogResult<ItemDifficulty> {
    require_slug("interactive_learning_unit", &def.slug)?;
    require_title("interactive_learning_unit", &def.title)?;
    if def.estimated_minutes <= 0 {
        return Err(CatalogError::validation(
            "interactive_learning_unit",
            "estimated_minutes",
            "must be greater than 0",
        ));
    }
    parse_field(
        "interactive_learning_unit",
        "difficulty_level",
        def.difficulty_level.parse(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_rejects_unknown_certification_track() {
        let mut def = CourseDefinition::new("python-basics", "Python Basics");
        def.certification_track = Some("python".to_string());
        let err = validate_course(&def).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation {
                field: "certification_track",
                ..
            }
        ));

        assert!(repair_certification_track(&mut def));
        assert_eq!(def.certification_track, None);
        assert!(validate_course(&def).is_ok());
        assert!(!repair_certification_track(&mut def));
    }

    #[test]
    fn course_maps_level_aliases() {
        let mut def = CourseDefinition::new("go", "Go");
        def.difficulty_level = Some("hard".to_string());
        def.certification_track = Some("cka".to_string());
        let valid = validate_course(&def).unwrap();
        assert_eq!(valid.difficulty_level, Some(DifficultyLevel::Advanced));
        assert_eq!(valid.certification_track, Some(CertificationTrack::Cka));
    }

    #[test]
    fn course_rejects_bad_slug() {
        let def = CourseDefinition::new("Docker Fundamentals", "Docker");
        assert!(validate_course(&def).unwrap_err().is_validation());
    }

    #[test]
    fn code_editor_lab_needs_language_and_starter_code() {
        let mut lab = LabDefinition::new("two-sum", "Two Sum");
        lab.lab_type = "python".to_string();
        lab.lab_format = "code_editor".to_string();
        assert!(validate_lab(&lab).is_err());

        lab.programming_language = Some("python".to_string());
        assert!(validate_lab(&lab).is_err());

        lab.starter_code = Some("def solve():\n    pass\n".to_string());
        let valid = validate_lab(&lab).unwrap();
        assert_eq!(valid.programming_language, Some(ProgrammingLanguage::Python));
    }

    #[test]
    fn lab_rejects_unknown_type() {
        let mut lab = LabDefinition::new("first-container", "First Container");
        lab.lab_type = "cobol".to_string();
        let err = validate_lab(&lab).unwrap_err();
        assert!(err.to_string().contains("lab_type"));
    }

    #[test]
    fn mcq_answer_must_be_an_option() {
        let mut q = QuestionDefinition::mcq("Pick one", &["a", "b"], 5);
        assert!(validate_question(&q).is_err());
        q.correct_index = Some(0);
        assert_eq!(
            validate_question(&q).unwrap().correct_answer.as_deref(),
            Some("a")
        );
    }

    #[test]
    fn quiz_passing_score_bounds() {
        let mut quiz = QuizDefinition::new("Basics Quiz");
        quiz.passing_score = 120;
        assert!(validate_quiz(&quiz).is_err());
        quiz.passing_score = 80;
        assert!(validate_quiz(&quiz).unwrap().is_empty());
    }
}
