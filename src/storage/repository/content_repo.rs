use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{
    ItemKind, ItemRef, LabDefinition, LessonDefinition, QuestionDefinition, QuizDefinition,
    UnitDefinition, Upserted,
};
use crate::catalog::validation::{
    validate_lab, validate_lesson, validate_question, validate_quiz, validate_unit, ValidLab,
    ValidQuestion,
};
use crate::storage::entity::course_lesson::{self, Entity as CourseLesson};
use crate::storage::entity::hands_on_lab::{self, Entity as HandsOnLab};
use crate::storage::entity::interactive_learning_unit::{self, Entity as InteractiveLearningUnit};
use crate::storage::entity::quiz::{self, Entity as Quiz};
use crate::storage::entity::quiz_question::{self, Entity as QuizQuestion};
use chrono::Utc;
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

/// A resolved polymorphic item.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Lesson(course_lesson::Model),
    Quiz(quiz::Model),
    Unit(interactive_learning_unit::Model),
    Lab(hands_on_lab::Model),
}

impl ContentItem {
    pub fn title(&self) -> &str {
        match self {
            ContentItem::Lesson(m) => &m.title,
            ContentItem::Quiz(m) => &m.title,
            ContentItem::Unit(m) => &m.title,
            ContentItem::Lab(m) => &m.title,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        match self {
            ContentItem::Lesson(m) => ItemRef::lesson(m.id),
            ContentItem::Quiz(m) => ItemRef::quiz(m.id),
            ContentItem::Unit(m) => ItemRef::unit(m.id),
            ContentItem::Lab(m) => ItemRef::lab(m.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentCounts {
    pub lessons: u64,
    pub quizzes: u64,
    pub questions: u64,
    pub labs: u64,
    pub units: u64,
}

pub struct ContentRepository;

fn question_model(
    quiz_id: i32,
    position: i32,
    def: &QuestionDefinition,
    valid: &ValidQuestion,
    now: i64,
) -> CatalogResult<quiz_question::ActiveModel> {
    Ok(quiz_question::ActiveModel {
        quiz_id: Set(quiz_id),
        question_type: Set(valid.question_type.as_str().to_string()),
        question_text: Set(def.question_text.trim().to_string()),
        options: Set(serde_json::to_string(&def.options)?),
        correct_answer: Set(valid.correct_answer.clone()),
        explanation: Set(def.explanation.clone()),
        points: Set(def.points),
        difficulty_level: Set(valid.difficulty_level.map(|d| d.as_str().to_string())),
        irt_difficulty: Set(def.irt_difficulty),
        irt_discrimination: Set(def.irt_discrimination),
        irt_guessing: Set(def.irt_guessing),
        sequence_order: Set(position),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
}

fn apply_lab(
    am: &mut hands_on_lab::ActiveModel,
    def: &LabDefinition,
    valid: &ValidLab,
) -> CatalogResult<()> {
    am.title = Set(def.title.trim().to_string());
    am.description = Set(def.description.clone());
    am.difficulty = Set(valid.difficulty.as_str().to_string());
    am.lab_type = Set(valid.lab_type.as_str().to_string());
    am.lab_format = Set(valid.lab_format.as_str().to_string());
    am.estimated_minutes = Set(def.estimated_minutes);
    am.max_attempts = Set(def.max_attempts);
    am.points_reward = Set(def.points_reward);
    am.programming_language = Set(valid.programming_language.map(|l| l.as_str().to_string()));
    am.starter_code = Set(def.starter_code.clone());
    am.solution_code = Set(def.solution_code.clone());
    am.steps = Set(serde_json::to_string(&def.steps)?);
    am.test_cases = Set(serde_json::to_string(&def.test_cases)?);
    am.category = Set(def.category.clone());
    am.is_active = Set(def.is_active);
    Ok(())
}

fn apply_unit(
    am: &mut interactive_learning_unit::ActiveModel,
    def: &UnitDefinition,
    difficulty: &str,
) -> CatalogResult<()> {
    am.title = Set(def.title.trim().to_string());
    am.concept_explanation = Set(def.concept_explanation.clone());
    am.command_to_learn = Set(def.command_to_learn.clone());
    am.command_variations = Set(serde_json::to_string(&def.command_variations)?);
    am.practice_hints = Set(serde_json::to_string(&def.practice_hints)?);
    am.difficulty_level = Set(difficulty.to_string());
    am.estimated_minutes = Set(def.estimated_minutes);
    am.category = Set(def.category.clone());
    am.published = Set(def.published);
    Ok(())
}

impl ContentRepository {
    // --- 课时 ---

    pub async fn find_lesson<C: ConnectionTrait>(
        db: &C,
        title: &str,
    ) -> CatalogResult<Option<course_lesson::Model>> {
        Ok(CourseLesson::find()
            .filter(course_lesson::Column::Title.eq(title.trim()))
            .order_by_asc(course_lesson::Column::Id)
            .one(db)
            .await?)
    }

    pub async fn find_or_create_lesson<C: ConnectionTrait>(
        db: &C,
        def: &LessonDefinition,
    ) -> CatalogResult<Upserted<course_lesson::Model>> {
        if let Some(existing) = Self::find_lesson(db, &def.title).await? {
            debug!("lesson '{}' reused (id={})", def.title, existing.id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert_lesson(db, def).await.map(Upserted::Created)
    }

    pub async fn upsert_lesson<C: ConnectionTrait>(
        db: &C,
        def: &LessonDefinition,
    ) -> CatalogResult<Upserted<course_lesson::Model>> {
        let Some(existing) = Self::find_lesson(db, &def.title).await? else {
            return Self::insert_lesson(db, def).await.map(Upserted::Created);
        };
        validate_lesson(def)?;
        let mut am: course_lesson::ActiveModel = existing.into();
        am.content = Set(def.content.clone());
        am.video_url = Set(def.video_url.clone());
        am.reading_time_minutes = Set(def.reading_time_minutes);
        am.key_concepts = Set(serde_json::to_string(&def.key_concepts)?);
        am.updated_at = Set(Utc::now().timestamp());
        Ok(Upserted::Updated(am.update(db).await?))
    }

    async fn insert_lesson<C: ConnectionTrait>(
        db: &C,
        def: &LessonDefinition,
    ) -> CatalogResult<course_lesson::Model> {
        validate_lesson(def)?;
        let now = Utc::now().timestamp();
        let am = course_lesson::ActiveModel {
            title: Set(def.title.trim().to_string()),
            content: Set(def.content.clone()),
            video_url: Set(def.video_url.clone()),
            reading_time_minutes: Set(def.reading_time_minutes),
            key_concepts: Set(serde_json::to_string(&def.key_concepts)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = am.insert(db).await?;
        info!("lesson created: '{}' (id={})", model.title, model.id);
        Ok(model)
    }

    // --- 测验 ---

    pub async fn find_quiz<C: ConnectionTrait>(
        db: &C,
        title: &str,
    ) -> CatalogResult<Option<quiz::Model>> {
        Ok(Quiz::find()
            .filter(quiz::Column::Title.eq(title.trim()))
            .order_by_asc(quiz::Column::Id)
            .one(db)
            .await?)
    }

    /// 测验按标题查找；新建时一并写入题目。已有测验的题目不动。
    pub async fn find_or_create_quiz<C: ConnectionTrait>(
        db: &C,
        def: &QuizDefinition,
    ) -> CatalogResult<Upserted<quiz::Model>> {
        if let Some(existing) = Self::find_quiz(db, &def.title).await? {
            debug!("quiz '{}' reused (id={})", def.title, existing.id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert_quiz(db, def).await.map(Upserted::Created)
    }

    /// Update path: applies quiz attributes and replaces the question set.
    pub async fn upsert_quiz<C: ConnectionTrait>(
        db: &C,
        def: &QuizDefinition,
    ) -> CatalogResult<Upserted<quiz::Model>> {
        let Some(existing) = Self::find_quiz(db, &def.title).await? else {
            return Self::insert_quiz(db, def).await.map(Upserted::Created);
        };
        let valid = validate_quiz(def)?;
        let mut am: quiz::ActiveModel = existing.into();
        am.description = Set(def.description.clone());
        am.time_limit_minutes = Set(def.time_limit_minutes);
        am.passing_score = Set(def.passing_score);
        am.max_attempts = Set(def.max_attempts);
        am.shuffle_questions = Set(def.shuffle_questions);
        am.show_correct_answers = Set(def.show_correct_answers);
        am.updated_at = Set(Utc::now().timestamp());
        let model = am.update(db).await?;
        Self::write_questions(db, model.id, &def.questions, &valid).await?;
        Ok(Upserted::Updated(model))
    }

    async fn insert_quiz<C: ConnectionTrait>(
        db: &C,
        def: &QuizDefinition,
    ) -> CatalogResult<quiz::Model> {
        let valid = validate_quiz(def)?;
        let now = Utc::now().timestamp();
        let am = quiz::ActiveModel {
            title: Set(def.title.trim().to_string()),
            description: Set(def.description.clone()),
            time_limit_minutes: Set(def.time_limit_minutes),
            passing_score: Set(def.passing_score),
            max_attempts: Set(def.max_attempts),
            shuffle_questions: Set(def.shuffle_questions),
            show_correct_answers: Set(def.show_correct_answers),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = am.insert(db).await?;
        Self::write_questions(db, model.id, &def.questions, &valid).await?;
        info!(
            "quiz created: '{}' (id={}, questions={})",
            model.title,
            model.id,
            def.questions.len()
        );
        Ok(model)
    }

    /// 删除测验现有题目并按给定顺序重新写入，返回写入数量
    pub async fn replace_questions<C: ConnectionTrait>(
        db: &C,
        quiz_id: i32,
        questions: &[QuestionDefinition],
    ) -> CatalogResult<usize> {
        if Quiz::find_by_id(quiz_id).one(db).await?.is_none() {
            return Err(CatalogError::not_found("quiz", quiz_id));
        }
        let valid = questions
            .iter()
            .map(validate_question)
            .collect::<CatalogResult<Vec<_>>>()?;
        Self::write_questions(db, quiz_id, questions, &valid).await
    }

    async fn write_questions<C: ConnectionTrait>(
        db: &C,
        quiz_id: i32,
        questions: &[QuestionDefinition],
        valid: &[ValidQuestion],
    ) -> CatalogResult<usize> {
        QuizQuestion::delete_many()
            .filter(quiz_question::Column::QuizId.eq(quiz_id))
            .exec(db)
            .await?;
        if questions.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().timestamp();
        let models = questions
            .iter()
            .zip(valid)
            .enumerate()
            .map(|(i, (def, v))| question_model(quiz_id, i as i32 + 1, def, v, now))
            .collect::<CatalogResult<Vec<_>>>()?;
        QuizQuestion::insert_many(models).exec(db).await?;
        Ok(questions.len())
    }

    pub async fn questions_for_quiz<C: ConnectionTrait>(
        db: &C,
        quiz_id: i32,
    ) -> CatalogResult<Vec<quiz_question::Model>> {
        Ok(QuizQuestion::find()
            .filter(quiz_question::Column::QuizId.eq(quiz_id))
            .order_by_asc(quiz_question::Column::SequenceOrder)
            .all(db)
            .await?)
    }

    // --- 实验 ---

    pub async fn find_lab<C: ConnectionTrait>(
        db: &C,
        slug: &str,
    ) -> CatalogResult<Option<hands_on_lab::Model>> {
        Ok(HandsOnLab::find()
            .filter(hands_on_lab::Column::Slug.eq(slug))
            .one(db)
            .await?)
    }

    pub async fn find_or_create_lab<C: ConnectionTrait>(
        db: &C,
        def: &LabDefinition,
    ) -> CatalogResult<Upserted<hands_on_lab::Model>> {
        if let Some(existing) = Self::find_lab(db, &def.slug).await? {
            debug!("lab {} reused (id={})", def.slug, existing.id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert_lab(db, def).await.map(Upserted::Created)
    }

    pub async fn upsert_lab<C: ConnectionTrait>(
        db: &C,
        def: &LabDefinition,
    ) -> CatalogResult<Upserted<hands_on_lab::Model>> {
        let Some(existing) = Self::find_lab(db, &def.slug).await? else {
            return Self::insert_lab(db, def).await.map(Upserted::Created);
        };
        let valid = validate_lab(def)?;
        let mut am: hands_on_lab::ActiveModel = existing.into();
        apply_lab(&mut am, def, &valid)?;
        am.updated_at = Set(Utc::now().timestamp());
        Ok(Upserted::Updated(am.update(db).await?))
    }

    async fn insert_lab<C: ConnectionTrait>(
        db: &C,
        def: &LabDefinition,
    ) -> CatalogResult<hands_on_lab::Model> {
        let valid = validate_lab(def)?;
        let now = Utc::now().timestamp();
        let mut am = hands_on_lab::ActiveModel {
            slug: Set(def.slug.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_lab(&mut am, def, &valid)?;
        let model = am.insert(db).await?;
        info!("lab created: {} (id={}, type={})", model.slug, model.id, model.lab_type);
        Ok(model)
    }

    // --- 交互单元 ---

    pub async fn find_unit<C: ConnectionTrait>(
        db: &C,
        slug: &str,
    ) -> CatalogResult<Option<interactive_learning_unit::Model>> {
        Ok(InteractiveLearningUnit::find()
            .filter(interactive_learning_unit::Column::Slug.eq(slug))
            .one(db)
            .await?)
    }

    pub async fn find_or_create_unit<C: ConnectionTrait>(
        db: &C,
        def: &UnitDefinition,
    ) -> CatalogResult<Upserted<interactive_learning_unit::Model>> {
        if let Some(existing) = Self::find_unit(db, &def.slug).await? {
            debug!("unit {} reused (id={})", def.slug, existing.id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert_unit(db, def).await.map(Upserted::Created)
    }

    pub async fn upsert_unit<C: ConnectionTrait>(
        db: &C,
        def: &UnitDefinition,
    ) -> CatalogResult<Upserted<interactive_learning_unit::Model>> {
        let Some(existing) = Self::find_unit(db, &def.slug).await? else {
            return Self::insert_unit(db, def).await.map(Upserted::Created);
        };
        let difficulty = validate_unit(def)?;
        let mut am: interactive_learning_unit::ActiveModel = existing.into();
        apply_unit(&mut am, def, difficulty.as_str())?;
        am.updated_at = Set(Utc::now().timestamp());
        Ok(Upserted::Updated(am.update(db).await?))
    }

    async fn insert_unit<C: ConnectionTrait>(
        db: &C,
        def: &UnitDefinition,
    ) -> CatalogResult<interactive_learning_unit::Model> {
        let difficulty = validate_unit(def)?;
        let now = Utc::now().timestamp();
        let mut am = interactive_learning_unit::ActiveModel {
            slug: Set(def.slug.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_unit(&mut am, def, difficulty.as_str())?;
        let model = am.insert(db).await?;
        info!("unit created: {} (id={})", model.slug, model.id);
        Ok(model)
    }

    // --- 多态访问 ---

    /// Looks an item up by kind and natural key (title or slug).
    pub async fn find_by_natural_key<C: ConnectionTrait>(
        db: &C,
        kind: ItemKind,
        key: &str,
    ) -> CatalogResult<Option<ContentItem>> {
        Ok(match kind {
            ItemKind::CourseLesson => Self::find_lesson(db, key).await?.map(ContentItem::Lesson),
            ItemKind::Quiz => Self::find_quiz(db, key).await?.map(ContentItem::Quiz),
            ItemKind::InteractiveLearningUnit => {
                Self::find_unit(db, key).await?.map(ContentItem::Unit)
            }
            ItemKind::HandsOnLab => Self::find_lab(db, key).await?.map(ContentItem::Lab),
        })
    }

    pub async fn find<C: ConnectionTrait>(
        db: &C,
        item: ItemRef,
    ) -> CatalogResult<Option<ContentItem>> {
        Ok(match item.kind {
            ItemKind::CourseLesson => CourseLesson::find_by_id(item.id)
                .one(db)
                .await?
                .map(ContentItem::Lesson),
            ItemKind::Quiz => Quiz::find_by_id(item.id).one(db).await?.map(ContentItem::Quiz),
            ItemKind::InteractiveLearningUnit => InteractiveLearningUnit::find_by_id(item.id)
                .one(db)
                .await?
                .map(ContentItem::Unit),
            ItemKind::HandsOnLab => HandsOnLab::find_by_id(item.id)
                .one(db)
                .await?
                .map(ContentItem::Lab),
        })
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, item: ItemRef) -> CatalogResult<bool> {
        Ok(Self::find(db, item).await?.is_some())
    }

    pub async fn resolve<C: ConnectionTrait>(db: &C, item: ItemRef) -> CatalogResult<ContentItem> {
        Self::find(db, item)
            .await?
            .ok_or_else(|| CatalogError::missing_item(item))
    }

    pub async fn counts<C: ConnectionTrait>(db: &C) -> CatalogResult<ContentCounts> {
        Ok(ContentCounts {
            lessons: CourseLesson::find().count(db).await?,
            quizzes: Quiz::find().count(db).await?,
            questions: QuizQuestion::find().count(db).await?,
            labs: HandsOnLab::find().count(db).await?,
            units: InteractiveLearningUnit::find().count(db).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_db;

    fn basics_quiz() -> QuizDefinition {
        let mut quiz = QuizDefinition::new("Docker Basics Quiz");
        quiz.questions = vec![
            QuestionDefinition::mcq("What does `docker ps` list?", &["Images", "Containers"], 1),
            QuestionDefinition::mcq("Which file builds an image?", &["Dockerfile", "Makefile"], 0),
        ];
        quiz
    }

    #[tokio::test]
    async fn lesson_is_reused_by_title() {
        let db = memory_db().await;
        let mut def = LessonDefinition::new("What is a Container?");
        def.content = Some("# Containers".to_string());

        let first = ContentRepository::find_or_create_lesson(&db, &def).await.unwrap();
        def.content = Some("changed".to_string());
        let second = ContentRepository::find_or_create_lesson(&db, &def).await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.get().id, second.get().id);
        assert_eq!(second.get().content.as_deref(), Some("# Containers"));
        assert_eq!(ContentRepository::counts(&db).await.unwrap().lessons, 1);
    }

    #[tokio::test]
    async fn quiz_questions_written_on_create_only() {
        let db = memory_db().await;
        let quiz = ContentRepository::find_or_create_quiz(&db, &basics_quiz())
            .await
            .unwrap()
            .into_inner();
        let questions = ContentRepository::questions_for_quiz(&db, quiz.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer.as_deref(), Some("Containers"));
        assert_eq!(questions[1].sequence_order, 2);

        // 再次 find_or_create 不会重复写题
        let mut again = basics_quiz();
        again.questions.pop();
        ContentRepository::find_or_create_quiz(&db, &again).await.unwrap();
        assert_eq!(ContentRepository::counts(&db).await.unwrap().questions, 2);

        // 显式更新替换题目
        let updated = ContentRepository::upsert_quiz(&db, &again).await.unwrap();
        assert!(matches!(updated, Upserted::Updated(_)));
        assert_eq!(ContentRepository::counts(&db).await.unwrap().questions, 1);
    }

    #[tokio::test]
    async fn invalid_question_blocks_quiz_creation() {
        let db = memory_db().await;
        let mut quiz = basics_quiz();
        quiz.questions.push(QuestionDefinition::mcq("Broken", &["only"], 0));
        let err = ContentRepository::find_or_create_quiz(&db, &quiz)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(ContentRepository::counts(&db).await.unwrap().quizzes, 0);
    }

    #[tokio::test]
    async fn replace_questions_renumbers_and_keeps_old_set_on_error() {
        let db = memory_db().await;
        let quiz = ContentRepository::find_or_create_quiz(&db, &basics_quiz())
            .await
            .unwrap()
            .into_inner();

        let replacement = vec![
            QuestionDefinition::mcq("Which flag detaches?", &["-d", "-it", "-p"], 0),
            QuestionDefinition::mcq("Default registry?", &["Docker Hub", "GHCR"], 0),
            QuestionDefinition::mcq("Layer instruction?", &["RUN", "LABEL"], 0),
        ];
        let written = ContentRepository::replace_questions(&db, quiz.id, &replacement)
            .await
            .unwrap();
        assert_eq!(written, 3);
        let questions = ContentRepository::questions_for_quiz(&db, quiz.id).await.unwrap();
        let positions: Vec<_> = questions.iter().map(|q| q.sequence_order).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(questions[0].question_text, "Which flag detaches?");

        let err = ContentRepository::replace_questions(&db, 404, &replacement)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // 校验失败时旧题目保持不变
        let broken = vec![
            QuestionDefinition::mcq("Fine", &["a", "b"], 1),
            QuestionDefinition::mcq("Broken", &["only"], 0),
        ];
        let err = ContentRepository::replace_questions(&db, quiz.id, &broken)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let kept = ContentRepository::questions_for_quiz(&db, quiz.id).await.unwrap();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].question_text, "Layer instruction?");
    }

    #[tokio::test]
    async fn lab_upsert_applies_changes() {
        let db = memory_db().await;
        let mut lab = LabDefinition::new("first-container", "Run Your First Container");
        let created = ContentRepository::find_or_create_lab(&db, &lab).await.unwrap();
        assert!(created.was_created());

        lab.points_reward = 25;
        lab.steps = vec![serde_json::json!({"title": "docker run hello-world"})];
        let updated = ContentRepository::upsert_lab(&db, &lab).await.unwrap().into_inner();
        assert_eq!(updated.id, created.get().id);
        assert_eq!(updated.points_reward, 25);
        assert!(updated.steps.contains("hello-world"));
    }

    #[tokio::test]
    async fn resolve_by_ref_and_natural_key() {
        let db = memory_db().await;
        let unit = ContentRepository::find_or_create_unit(
            &db,
            &UnitDefinition::new("docker-run", "docker run"),
        )
        .await
        .unwrap()
        .into_inner();

        let item = ContentRepository::resolve(&db, ItemRef::unit(unit.id)).await.unwrap();
        assert_eq!(item.title(), "docker run");
        assert_eq!(item.item_ref(), ItemRef::unit(unit.id));

        let by_key = ContentRepository::find_by_natural_key(
            &db,
            ItemKind::InteractiveLearningUnit,
            "docker-run",
        )
        .await
        .unwrap();
        assert_eq!(by_key, Some(item));

        let err = ContentRepository::resolve(&db, ItemRef::lab(99)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!ContentRepository::exists(&db, ItemRef::quiz(1)).await.unwrap());
    }
}
