use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{ModuleDefinition, Upserted};
use crate::catalog::validation::validate_module;
use crate::storage::entity::course::Entity as Course;
use crate::storage::entity::course_module::{
    self, ActiveModel as ModuleActiveModel, Entity as CourseModule, Model as ModuleModel,
};
use crate::storage::entity::module_item::{self, Entity as ModuleItem};
use chrono::Utc;
use log::{debug, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

pub struct ModuleRepository;

impl ModuleRepository {
    pub async fn find_by_slug<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
        slug: &str,
    ) -> CatalogResult<Option<ModuleModel>> {
        Ok(CourseModule::find()
            .filter(course_module::Column::CourseId.eq(course_id))
            .filter(course_module::Column::Slug.eq(slug))
            .one(db)
            .await?)
    }

    pub async fn get_by_slug<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
        slug: &str,
    ) -> CatalogResult<ModuleModel> {
        Self::find_by_slug(db, course_id, slug)
            .await?
            .ok_or_else(|| CatalogError::not_found("course_module", slug))
    }

    pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<ModuleModel> {
        CourseModule::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| CatalogError::not_found("course_module", id))
    }

    /// 某课程下所有模块，按 (sequence_order, id) 排序
    pub async fn list_for_course<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
    ) -> CatalogResult<Vec<ModuleModel>> {
        Ok(CourseModule::find()
            .filter(course_module::Column::CourseId.eq(course_id))
            .order_by_asc(course_module::Column::SequenceOrder)
            .order_by_asc(course_module::Column::Id)
            .all(db)
            .await?)
    }

    /// Next free position at the end of the course (max + 1).
    pub async fn next_sequence<C: ConnectionTrait>(db: &C, course_id: i32) -> CatalogResult<i32> {
        let max: Option<Option<i32>> = CourseModule::find()
            .select_only()
            .column_as(course_module::Column::SequenceOrder.max(), "max_seq")
            .filter(course_module::Column::CourseId.eq(course_id))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().unwrap_or(0) + 1)
    }

    /// 查找 (course, slug)；不存在时创建。未给出位置时追加到末尾。
    pub async fn find_or_create<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
        def: &ModuleDefinition,
    ) -> CatalogResult<Upserted<ModuleModel>> {
        let slug = def.natural_slug();
        if let Some(existing) = Self::find_by_slug(db, course_id, &slug).await? {
            debug!("module {} already present in course {}", slug, course_id);
            return Ok(Upserted::Existing(existing));
        }
        Self::insert(db, course_id, def).await.map(Upserted::Created)
    }

    /// Applies attributes to an existing module. Position is left alone; only the
    /// resequencer moves modules once they exist.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
        def: &ModuleDefinition,
    ) -> CatalogResult<Upserted<ModuleModel>> {
        let slug = def.natural_slug();
        let Some(existing) = Self::find_by_slug(db, course_id, &slug).await? else {
            return Self::insert(db, course_id, def).await.map(Upserted::Created);
        };

        validate_module(def)?;
        let mut am: ModuleActiveModel = existing.into();
        am.title = Set(def.title.trim().to_string());
        am.description = Set(def.description.clone());
        am.estimated_minutes = Set(def.estimated_minutes);
        am.learning_objectives = Set(serde_json::to_string(&def.learning_objectives)?);
        am.published = Set(def.published);
        am.updated_at = Set(Utc::now().timestamp());
        Ok(Upserted::Updated(am.update(db).await?))
    }

    async fn insert<C: ConnectionTrait>(
        db: &C,
        course_id: i32,
        def: &ModuleDefinition,
    ) -> CatalogResult<ModuleModel> {
        validate_module(def)?;
        if Course::find_by_id(course_id).one(db).await?.is_none() {
            return Err(CatalogError::not_found("course", course_id));
        }

        let sequence_order = match def.sequence_order {
            Some(n) => n,
            None => Self::next_sequence(db, course_id).await?,
        };
        let now = Utc::now().timestamp();
        let am = ModuleActiveModel {
            course_id: Set(course_id),
            slug: Set(def.natural_slug()),
            title: Set(def.title.trim().to_string()),
            description: Set(def.description.clone()),
            sequence_order: Set(sequence_order),
            estimated_minutes: Set(def.estimated_minutes),
            learning_objectives: Set(serde_json::to_string(&def.learning_objectives)?),
            published: Set(def.published),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = am.insert(db).await?;
        info!(
            "module created: {} (course={}, position={})",
            model.slug, course_id, model.sequence_order
        );
        Ok(model)
    }

    pub async fn set_sequence<C: ConnectionTrait>(
        db: &C,
        id: i32,
        sequence_order: i32,
    ) -> CatalogResult<()> {
        CourseModule::update_many()
            .col_expr(
                course_module::Column::SequenceOrder,
                Expr::value(sequence_order),
            )
            .col_expr(
                course_module::Column::UpdatedAt,
                Expr::value(Utc::now().timestamp()),
            )
            .filter(course_module::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// 删除模块及其条目；内容行不受影响
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> CatalogResult<bool> {
        ModuleItem::delete_many()
            .filter(module_item::Column::CourseModuleId.eq(id))
            .exec(db)
            .await?;
        let res = CourseModule::delete_by_id(id).exec(db).await?;
        Ok(res.rows_affected > 0)
    }
}
