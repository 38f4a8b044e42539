use crate::storage::entity::{
    course, course_lesson, course_module, hands_on_lab, interactive_learning_unit, module_item,
    quiz, quiz_question,
};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    EntityTrait, Schema, Statement,
};
use std::time::Duration;

/// 额外索引：唯一性约束 + 排序查询
const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_course_modules_course_slug ON course_modules(course_id, slug);",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_module_items_item ON module_items(course_module_id, item_type, item_id);",
    "CREATE INDEX IF NOT EXISTS idx_module_items_sequence ON module_items(course_module_id, sequence_order);",
    "CREATE INDEX IF NOT EXISTS idx_module_items_target ON module_items(item_type, item_id);",
    "CREATE INDEX IF NOT EXISTS idx_course_lessons_title ON course_lessons(title);",
    "CREATE INDEX IF NOT EXISTS idx_quizzes_title ON quizzes(title);",
    "CREATE INDEX IF NOT EXISTS idx_quiz_questions_quiz ON quiz_questions(quiz_id, sequence_order);",
];

pub fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    establish_connection_with(db_url, 10).await
}

/// 内存库连接一旦回收数据即丢失
const MEMORY_CONNECTION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn pool_options(db_url: &str, max_connections: u32) -> ConnectOptions {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Info);

    if is_memory_url(db_url) {
        // 内存库每个连接都是独立数据库：只保留一个连接且不过期
        opt.max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_CONNECTION_TTL)
            .max_lifetime(MEMORY_CONNECTION_TTL);
    } else {
        opt.max_connections(max_connections.max(1))
            .min_connections(1)
            .idle_timeout(Duration::from_secs(8))
            .max_lifetime(Duration::from_secs(8));
    }
    opt
}

pub async fn establish_connection_with(
    db_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let opt = pool_options(db_url, max_connections);
    let db = Database::connect(opt).await?;
    let backend = db.get_database_backend();

    if backend == DatabaseBackend::Sqlite && !is_memory_url(db_url) {
        // 启用 WAL 模式
        db.execute(Statement::from_string(
            backend,
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
    }

    create_schema(&db).await?;

    info!("Catalog store ready ({:?}, url={})", backend, db_url);

    Ok(db)
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let stmt = builder.build(schema.create_table_from_entity(entity).if_not_exists());
    db.execute(stmt).await?;
    Ok(())
}

/// 创建表（如果不存在）。父表先于子表创建。
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, course::Entity).await?;
    create_table(db, &schema, course_module::Entity).await?;
    create_table(db, &schema, course_lesson::Entity).await?;
    create_table(db, &schema, quiz::Entity).await?;
    create_table(db, &schema, quiz_question::Entity).await?;
    create_table(db, &schema, hands_on_lab::Entity).await?;
    create_table(db, &schema, interactive_learning_unit::Entity).await?;
    create_table(db, &schema, module_item::Entity).await?;

    for sql in INDEXES {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entity::Course;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn memory_store_creates_empty_schema() {
        let db = establish_connection("sqlite::memory:").await.unwrap();
        assert_eq!(Course::find().count(&db).await.unwrap(), 0);

        // 重复建表不应报错
        create_schema(&db).await.unwrap();
    }

    #[test]
    fn memory_pool_keeps_its_single_connection() {
        let opt = pool_options("sqlite::memory:", 10);
        assert_eq!(opt.get_max_connections(), Some(1));
        assert_eq!(opt.get_min_connections(), Some(1));
        assert_eq!(opt.get_idle_timeout(), Some(MEMORY_CONNECTION_TTL));
        assert_eq!(opt.get_max_lifetime(), Some(MEMORY_CONNECTION_TTL));

        let file = pool_options("sqlite://catalog.db?mode=rwc", 4);
        assert_eq!(file.get_max_connections(), Some(4));
        assert_eq!(file.get_idle_timeout(), Some(Duration::from_secs(8)));
    }

    #[test]
    fn detects_memory_urls() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:catalog?mode=memory"));
        assert!(!is_memory_url("sqlite://catalog.db?mode=rwc"));
    }
}
