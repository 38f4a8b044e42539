use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{ItemRef, Upserted};
use crate::storage::entity::course_module::Entity as CourseModule;
use crate::storage::entity::module_item::{
    self, ActiveModel as ModuleItemActiveModel, Entity as ModuleItem, Model as ModuleItemModel,
};
use crate::storage::repository::content_repo::ContentRepository;
use chrono::Utc;
use log::{debug, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Polymorphic module membership. Referential integrity of `(item_type, item_id)`
/// is checked here since the database cannot express a foreign key for it.
pub struct ModuleItemRepository;

impl ModuleItemRepository {
    pub async fn find_link<C: ConnectionTrait>(
        db: &C,
        module_id: i32,
        item: ItemRef,
    ) -> CatalogResult<Option<ModuleItemModel>> {
        Ok(ModuleItem::find()
            .filter(module_item::Column::CourseModuleId.eq(module_id))
            .filter(module_item::Column::ItemType.eq(item.kind.as_str()))
            .filter(module_item::Column::ItemId.eq(item.id))
            .one(db)
            .await?)
    }

    /// 把内容挂到模块下。(module, kind, id) 已存在时原样返回，不改位置。
    pub async fn link<C: ConnectionTrait>(
        db: &C,
        module_id: i32,
        item: ItemRef,
        sequence_order: i32,
        required: bool,
    ) -> CatalogResult<Upserted<ModuleItemModel>> {
        if sequence_order < 1 {
            return Err(CatalogError::validation(
                "module_item",
                "sequence_order",
                "must be greater than or equal to 1",
            ));
        }
        if let Some(existing) = Self::find_link(db, module_id, item).await? {
            debug!("link {} already in module {}", item, module_id);
            return Ok(Upserted::Existing(existing));
        }
        if CourseModule::find_by_id(module_id).one(db).await?.is_none() {
            return Err(CatalogError::not_found("course_module", module_id));
        }
        if !ContentRepository::exists(db, item).await? {
            return Err(CatalogError::missing_item(item));
        }

        let now = Utc::now().timestamp();
        let am = ModuleItemActiveModel {
            course_module_id: Set(module_id),
            item_type: Set(item.kind.as_str().to_string()),
            item_id: Set(item.id),
            sequence_order: Set(sequence_order),
            required: Set(required),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = am.insert(db).await?;
        info!(
            "linked {} into module {} at position {}",
            item, module_id, sequence_order
        );
        Ok(Upserted::Created(model))
    }

    /// Links at the end of the module (max + 1).
    pub async fn append<C: ConnectionTrait>(
        db: &C,
        module_id: i32,
        item: ItemRef,
        required: bool,
    ) -> CatalogResult<Upserted<ModuleItemModel>> {
        if let Some(existing) = Self::find_link(db, module_id, item).await? {
            return Ok(Upserted::Existing(existing));
        }
        let position = Self::next_sequence(db, module_id).await?;
        Self::link(db, module_id, item, position, required).await
    }

    pub async fn update_link<C: ConnectionTrait>(
        db: &C,
        link_id: i32,
        sequence_order: Option<i32>,
        required: Option<bool>,
    ) -> CatalogResult<ModuleItemModel> {
        let existing = ModuleItem::find_by_id(link_id)
            .one(db)
            .await?
            .ok_or_else(|| CatalogError::not_found("module_item", link_id))?;

        let mut am: ModuleItemActiveModel = existing.into();
        if let Some(n) = sequence_order {
            if n < 1 {
                return Err(CatalogError::validation(
                    "module_item",
                    "sequence_order",
                    "must be greater than or equal to 1",
                ));
            }
            am.sequence_order = Set(n);
        }
        if let Some(r) = required {
            am.required = Set(r);
        }
        am.updated_at = Set(Utc::now().timestamp());
        Ok(am.update(db).await?)
    }

    /// 只删除链接，内容行保留
    pub async fn unlink<C: ConnectionTrait>(
        db: &C,
        module_id: i32,
        item: ItemRef,
    ) -> CatalogResult<bool> {
        let res = ModuleItem::delete_many()
            .filter(module_item::Column::CourseModuleId.eq(module_id))
            .filter(module_item::Column::ItemType.eq(item.kind.as_str()))
            .filter(module_item::Column::ItemId.eq(item.id))
            .exec(db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Full sibling set of a module, ordered by `(sequence_order, id)`.
    pub async fn items_for_module<C: ConnectionTrait>(
        db: &C,
        module_id: i32,
    ) -> CatalogResult<Vec<ModuleItemModel>> {
        Ok(ModuleItem::find()
            .filter(module_item::Column::CourseModuleId.eq(module_id))
            .order_by_asc(module_item::Column::SequenceOrder)
            .order_by_asc(module_item::Column::Id)
            .all(db)
            .await?)
    }

    /// Every module link that points at `item`, across all courses.
    pub async fn links_to_item<C: ConnectionTrait>(
        db: &C,
        item: ItemRef,
    ) -> CatalogResult<Vec<ModuleItemModel>> {
        Ok(ModuleItem::find()
            .filter(module_item::Column::ItemType.eq(item.kind.as_str()))
            .filter(module_item::Column::ItemId.eq(item.id))
            .order_by_asc(module_item::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn all<C: ConnectionTrait>(db: &C) -> CatalogResult<Vec<ModuleItemModel>> {
        Ok(ModuleItem::find()
            .order_by_asc(module_item::Column::CourseModuleId)
            .order_by_asc(module_item::Column::SequenceOrder)
            .order_by_asc(module_item::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn next_sequence<C: ConnectionTrait>(db: &C, module_id: i32) -> CatalogResult<i32> {
        let max: Option<Option<i32>> = ModuleItem::find()
            .select_only()
            .column_as(module_item::Column::SequenceOrder.max(), "max_seq")
            .filter(module_item::Column::CourseModuleId.eq(module_id))
            .into_tuple()
            .one(db)
            .await?;
        Ok(max.flatten().unwrap_or(0) + 1)
    }

    pub async fn set_sequence<C: ConnectionTrait>(
        db: &C,
        link_id: i32,
        sequence_order: i32,
    ) -> CatalogResult<()> {
        ModuleItem::update_many()
            .col_expr(module_item::Column::SequenceOrder, Expr::value(sequence_order))
            .col_expr(
                module_item::Column::UpdatedAt,
                Expr::value(Utc::now().timestamp()),
            )
            .filter(module_item::Column::Id.eq(link_id))
            .exec(db)
            .await?;
        Ok(())
    }
}
