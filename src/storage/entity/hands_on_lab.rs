use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hands_on_labs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub difficulty: String, // easy / medium / hard
    pub lab_type: String,
    pub lab_format: String, // terminal / code_editor / hybrid
    pub estimated_minutes: i32,
    pub max_attempts: i32,
    pub points_reward: i32,
    pub programming_language: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub starter_code: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub solution_code: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub steps: String, // JSON array
    #[sea_orm(column_type = "Text")]
    pub test_cases: String, // JSON array
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
