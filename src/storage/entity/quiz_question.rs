use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub quiz_id: i32,
    pub question_type: String, // mcq / true_false / command / fill_blank / numerical / equation / sequence
    #[sea_orm(column_type = "Text")]
    pub question_text: String,
    #[sea_orm(column_type = "Text")]
    pub options: String, // JSON array
    #[sea_orm(column_type = "Text", nullable)]
    pub correct_answer: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub explanation: Option<String>,
    pub points: i32,
    pub difficulty_level: Option<String>, // easy / medium / hard

    // IRT 参数，只有部分题库提供
    #[sea_orm(nullable)]
    pub irt_difficulty: Option<f64>,
    #[sea_orm(nullable)]
    pub irt_discrimination: Option<f64>,
    #[sea_orm(nullable)]
    pub irt_guessing: Option<f64>,

    pub sequence_order: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quiz::Entity",
        from = "Column::QuizId",
        to = "super::quiz::Column::Id",
        on_delete = "Cascade"
    )]
    Quiz,
}

impl Related<super::quiz::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quiz.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
