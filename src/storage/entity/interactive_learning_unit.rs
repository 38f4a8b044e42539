use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "interactive_learning_units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub concept_explanation: String,
    pub command_to_learn: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub command_variations: String, // JSON array
    #[sea_orm(column_type = "Text")]
    pub practice_hints: String, // JSON array
    pub difficulty_level: String, // easy / medium / hard
    pub estimated_minutes: i32,
    pub category: Option<String>,
    pub published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
