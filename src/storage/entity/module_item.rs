use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Polymorphic join: `(item_type, item_id)` points into one of the content tables.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "module_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub course_module_id: i32,
    pub item_type: String, // CourseLesson / Quiz / InteractiveLearningUnit / HandsOnLab
    pub item_id: i32,
    pub sequence_order: i32,
    pub required: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_module::Entity",
        from = "Column::CourseModuleId",
        to = "super::course_module::Column::Id",
        on_delete = "Cascade"
    )]
    CourseModule,
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseModule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `None` when the stored tag is not a known content kind.
    pub fn item_ref(&self) -> Option<crate::catalog::model::ItemRef> {
        self.item_type
            .parse()
            .ok()
            .map(|kind| crate::catalog::model::ItemRef::new(kind, self.item_id))
    }
}
