use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quizzes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub passing_score: i32,
    pub max_attempts: Option<i32>,
    pub shuffle_questions: bool,
    pub show_correct_answers: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quiz_question::Entity")]
    QuizQuestion,
}

impl Related<super::quiz_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuizQuestion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
