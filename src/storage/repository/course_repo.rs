use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{CourseDefinition, Upserted};
use crate::catalog::validation::{validate_course, ValidCourse};
use crate::storage::entity::course::{
    self, ActiveModel as CourseActiveModel, Entity as Course, Model as CourseModel,
};
use chrono::Utc;
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

pub struct CourseRepository;

fn apply_definition(
    am: &mut CourseActiveModel,
    def: &CourseDefinition,
    valid: &ValidCourse,
) -> CatalogResult<()> {
    am.title = Set(def.title.trim().to_string());
    am.description = Set(def.description.clone());
    am.difficulty_level = Set(valid.difficulty_level.map(|d| d.as_str().to_string()));
    am.estimated_hours = Set(def.estimated_hours);
    am.certification_track = Set(valid.certification_track.map(|t| t.as_str().to_string()));
    am.published = Set(def.published);
    am.learning_objectives = Set(serde_json::to_string(&def.learning_objectives)?);
    am.prerequisites = Set(serde_json::to_string(&def.prerequisites)?);
    Ok(())
}

impl CourseRepository {
    pub async fn find_by_slug<C: ConnectionTrait>(
        db: &C,
        slug: &str,
    ) -> CatalogResult<Option<CourseModel>> {
        Ok(Course::find()
            .filter(course::Column::Slug.eq(slug))
            .one(db)
            .await?)
    }

    pub async fn get_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> CatalogResult<CourseModel> {
        Self::find_by_slug(db, slug)
            .await?
            .ok_or_else(|| CatalogError::not_found("course", slug))
    }

    pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<CourseModel> {
        Course::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| CatalogError::not_found("course", id))
    }

    /// 按 slug 查找；不存在时校验并创建。已存在的记录原样返回，不会被改写。
    pub async fn find_or_create<C: ConnectionTrait>(
        db: &C,
        def: &CourseDefinition,
    ) -> CatalogResult<Upserted<CourseModel>> {
        if let Some(existing) = Self::find_by_slug(db, &def.slug).await? {
            debug!("course {} already present (id={})", def.slug, existing.id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert(db, def).await.map(Upserted::Created)
    }

    /// 显式更新路径：存在则覆盖属性，否则创建。
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        def: &CourseDefinition,
    ) -> CatalogResult<Upserted<CourseModel>> {
        let Some(existing) = Self::find_by_slug(db, &def.slug).await? else {
            return Self::insert(db, def).await.map(Upserted::Created);
        };

        let valid = validate_course(def)?;
        let mut am: CourseActiveModel = existing.into();
        apply_definition(&mut am, def, &valid)?;
        am.updated_at = Set(Utc::now().timestamp());
        let model = am.update(db).await?;
        Ok(Upserted::Updated(model))
    }

    async fn insert<C: ConnectionTrait>(
        db: &C,
        def: &CourseDefinition,
    ) -> CatalogResult<CourseModel> {
        let valid = validate_course(def)?;
        let now = Utc::now().timestamp();
        let mut am = CourseActiveModel {
            slug: Set(def.slug.clone()),
            sequence_order: Set(def.sequence_order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_definition(&mut am, def, &valid)?;
        let model = am.insert(db).await?;
        info!("course created: {} (id={})", model.slug, model.id);
        Ok(model)
    }

    pub async fn list<C: ConnectionTrait>(db: &C) -> CatalogResult<Vec<CourseModel>> {
        Ok(Course::find()
            .order_by_asc(course::Column::SequenceOrder)
            .order_by_asc(course::Column::Slug)
            .all(db)
            .await?)
    }

    /// Writes the track column without validation; used by the repair pass.
    pub async fn set_certification_track<C: ConnectionTrait>(
        db: &C,
        id: i32,
        track: Option<String>,
    ) -> CatalogResult<()> {
        let am = CourseActiveModel {
            id: Set(id),
            certification_track: Set(track),
            updated_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        am.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_db;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let db = memory_db().await;
        let mut def = CourseDefinition::new("docker-fundamentals", "Docker Fundamentals");
        def.difficulty_level = Some("beginner".to_string());

        let first = CourseRepository::find_or_create(&db, &def).await.unwrap();
        assert!(first.was_created());

        def.title = "Renamed".to_string();
        let second = CourseRepository::find_or_create(&db, &def).await.unwrap();
        assert!(matches!(second, Upserted::Existing(_)));
        assert_eq!(second.get().title, "Docker Fundamentals");
        assert_eq!(Course::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_applies_attributes_to_existing_row() {
        let db = memory_db().await;
        let mut def = CourseDefinition::new("go-basics", "Go Basics");
        CourseRepository::find_or_create(&db, &def).await.unwrap();

        def.title = "Go Fundamentals".to_string();
        def.learning_objectives = vec!["Write idiomatic Go".to_string()];
        let updated = CourseRepository::upsert(&db, &def).await.unwrap();
        assert!(matches!(updated, Upserted::Updated(_)));
        let model = updated.into_inner();
        assert_eq!(model.title, "Go Fundamentals");
        assert_eq!(model.learning_objectives, r#"["Write idiomatic Go"]"#);
        assert_eq!(Course::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_keeps_catalog_position() {
        let db = memory_db().await;
        let mut def = CourseDefinition::new("k8s-basics", "Kubernetes Basics");
        def.sequence_order = 5;
        let created = CourseRepository::find_or_create(&db, &def).await.unwrap();
        assert_eq!(created.get().sequence_order, 5);

        def.sequence_order = 0;
        def.title = "Kubernetes Fundamentals".to_string();
        let updated = CourseRepository::upsert(&db, &def).await.unwrap().into_inner();
        assert_eq!(updated.title, "Kubernetes Fundamentals");
        assert_eq!(updated.sequence_order, 5);
    }

    #[tokio::test]
    async fn invalid_track_is_rejected_before_write() {
        let db = memory_db().await;
        let mut def = CourseDefinition::new("python-basics", "Python Basics");
        def.certification_track = Some("python".to_string());

        let err = CourseRepository::find_or_create(&db, &def)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(Course::find().count(&db).await.unwrap(), 0);

        crate::catalog::validation::repair_certification_track(&mut def);
        let created = CourseRepository::find_or_create(&db, &def).await.unwrap();
        assert_eq!(created.get().certification_track, None);
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let db = memory_db().await;
        let err = CourseRepository::get_by_slug(&db, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
