use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub difficulty_level: Option<String>, // beginner / intermediate / advanced
    pub estimated_hours: Option<i32>,
    pub certification_track: Option<String>, // docker / dca / cka / ckad / cks / kubernetes / none
    pub published: bool,
    pub sequence_order: i32,
    #[sea_orm(column_type = "Text")]
    pub learning_objectives: String, // JSON array
    #[sea_orm(column_type = "Text")]
    pub prerequisites: String, // JSON array
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_module::Entity")]
    CourseModule,
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseModule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
