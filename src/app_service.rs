use crate::app_state::{AppEvent, CourseSummary};
use crate::catalog::maintenance::catalog_stats;
use crate::catalog::CatalogResult;
use crate::storage::repository::{CourseRepository, ModuleItemRepository, ModuleRepository};
use log::warn;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

pub async fn course_summaries(db: &DatabaseConnection) -> CatalogResult<Vec<CourseSummary>> {
    let mut list = Vec::new();
    for course in CourseRepository::list(db).await? {
        let modules = ModuleRepository::list_for_course(db, course.id).await?;
        let mut items = 0;
        for module in &modules {
            items += ModuleItemRepository::items_for_module(db, module.id)
                .await?
                .len();
        }
        list.push(CourseSummary {
            slug: course.slug,
            title: course.title,
            published: course.published,
            certification_track: course.certification_track,
            modules: modules.len(),
            items,
        });
    }
    Ok(list)
}

pub async fn refresh_ui(db: &DatabaseConnection, tx: &mpsc::UnboundedSender<AppEvent>) {
    // 1. 课程列表
    match course_summaries(db).await {
        Ok(list) => {
            let _ = tx.send(AppEvent::Courses(list));
        }
        Err(e) => warn!("course list refresh failed: {}", e),
    }

    // 2. 全库统计
    refresh_stats(db, tx).await;
}

pub async fn refresh_stats(db: &DatabaseConnection, tx: &mpsc::UnboundedSender<AppEvent>) {
    match catalog_stats(db).await {
        Ok(stats) => {
            let _ = tx.send(AppEvent::Stats(stats));
        }
        Err(e) => warn!("stats refresh failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{CourseDefinition, ItemRef, LessonDefinition, ModuleDefinition};
    use crate::storage::memory_db;
    use crate::storage::repository::ContentRepository;

    #[tokio::test]
    async fn refresh_sends_courses_then_stats() {
        let db = memory_db().await;
        let course = CourseRepository::find_or_create(
            &db,
            &CourseDefinition::new("docker-fundamentals", "Docker Fundamentals"),
        )
        .await
        .unwrap()
        .into_inner();
        let module =
            ModuleRepository::find_or_create(&db, course.id, &ModuleDefinition::new("intro", "Intro"))
                .await
                .unwrap()
                .into_inner();
        let lesson =
            ContentRepository::find_or_create_lesson(&db, &LessonDefinition::new("What is Docker?"))
                .await
                .unwrap()
                .into_inner();
        ModuleItemRepository::append(&db, module.id, ItemRef::lesson(lesson.id), true)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        refresh_ui(&db, &tx).await;

        match rx.try_recv().unwrap() {
            AppEvent::Courses(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].modules, 1);
                assert_eq!(list[0].items, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            AppEvent::Stats(stats) => assert_eq!(stats.content.lessons, 1),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
