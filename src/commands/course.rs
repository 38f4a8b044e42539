use crate::app_state::AppEvent;
use crate::catalog::maintenance::{clone_course, course_outline};
use crate::catalog::Resequencer;
use crate::storage::repository::{CourseRepository, ModuleRepository};
use anyhow::{Context, Result};
use log::info;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

pub async fn outline(
    course: &str,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let outline = course_outline(db, course)
        .await
        .with_context(|| format!("无法读取课程大纲 {}", course))?;
    let _ = evt_tx.send(AppEvent::Outline(outline));
    Ok(())
}

pub async fn resequence(
    course: &str,
    module: Option<&str>,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let c = CourseRepository::get_by_slug(db, course).await?;
    let msg = match module {
        Some(slug) => {
            let m = ModuleRepository::get_by_slug(db, c.id, slug).await?;
            let moved = Resequencer::resequence_items(db, m.id)
                .await
                .with_context(|| format!("重排 {}/{} 失败", course, slug))?;
            format!("✓ {}/{}: {} 个条目已调整位置", course, slug, moved)
        }
        None => {
            let r = Resequencer::resequence_course(db, c.id)
                .await
                .with_context(|| format!("重排 {} 失败", course))?;
            format!(
                "✓ {}: {} 个模块、{} 个条目已调整位置",
                course, r.modules_moved, r.items_moved
            )
        }
    };
    let _ = evt_tx.send(AppEvent::Message(msg));
    Ok(())
}

pub async fn reorder(
    course: &str,
    slugs: &[String],
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let c = CourseRepository::get_by_slug(db, course).await?;
    let moved = Resequencer::reorder_modules(db, c.id, slugs)
        .await
        .with_context(|| format!("调整 {} 的模块顺序失败", course))?;
    let _ = evt_tx.send(AppEvent::Message(format!(
        "✓ {}: 新顺序 {}（{} 个模块移动）",
        course,
        slugs.join(" → "),
        moved
    )));
    Ok(())
}

pub async fn remove_module(
    course: &str,
    module: &str,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let c = CourseRepository::get_by_slug(db, course).await?;
    Resequencer::remove_module(db, c.id, module)
        .await
        .with_context(|| format!("删除模块 {}/{} 失败", course, module))?;
    info!("module {}/{} removed", course, module);
    let _ = evt_tx.send(AppEvent::Message(format!(
        "✓ 已删除模块 {}/{}，剩余模块已重新编号",
        course, module
    )));
    Ok(())
}

pub async fn clone(
    source: &str,
    new_slug: &str,
    title: &str,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let summary = clone_course(db, source, new_slug, title)
        .await
        .with_context(|| format!("复制课程 {} 失败", source))?;
    let _ = evt_tx.send(AppEvent::Message(format!(
        "✓ 已复制 {} → {}: {} 个模块, {} 个条目（内容共享，未发布）",
        source, summary.course.slug, summary.modules, summary.links
    )));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{CourseDefinition, ModuleDefinition};
    use crate::storage::memory_db;

    async fn course_with_modules(db: &DatabaseConnection) -> i32 {
        let course = CourseRepository::find_or_create(
            db,
            &CourseDefinition::new("docker-fundamentals", "Docker Fundamentals"),
        )
        .await
        .unwrap()
        .into_inner();
        for (slug, n) in [("intro", 1), ("images", 4), ("networking", 9)] {
            ModuleRepository::find_or_create(db, course.id, &ModuleDefinition::new(slug, slug).at(n))
                .await
                .unwrap();
        }
        course.id
    }

    fn slugs_in_order(modules: &[crate::storage::entity::course_module::Model]) -> Vec<&str> {
        modules.iter().map(|m| m.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn reorder_then_remove_keeps_positions_dense() {
        let db = memory_db().await;
        let course_id = course_with_modules(&db).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        reorder(
            "docker-fundamentals",
            &["networking".to_string()],
            &db,
            &tx,
        )
        .await
        .unwrap();
        let modules = ModuleRepository::list_for_course(&db, course_id).await.unwrap();
        assert_eq!(slugs_in_order(&modules), vec!["networking", "intro", "images"]);

        remove_module("docker-fundamentals", "intro", &db, &tx)
            .await
            .unwrap();
        let modules = ModuleRepository::list_for_course(&db, course_id).await.unwrap();
        assert_eq!(slugs_in_order(&modules), vec!["networking", "images"]);
        let positions: Vec<i32> = modules.iter().map(|m| m.sequence_order).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[tokio::test]
    async fn resequence_reports_moves() {
        let db = memory_db().await;
        course_with_modules(&db).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        resequence("docker-fundamentals", None, &db, &tx).await.unwrap();
        match rx.try_recv().unwrap() {
            AppEvent::Message(m) => assert!(m.contains("2 个模块")),
            other => panic!("unexpected event {:?}", other),
        }

        let err = resequence("docker-fundamentals", Some("nope"), &db, &tx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn clone_copies_structure() {
        let db = memory_db().await;
        course_with_modules(&db).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        clone("docker-fundamentals", "docker-101", "Docker 101", &db, &tx)
            .await
            .unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Message(m) if m.contains("3 个模块")));
        assert!(clone("docker-fundamentals", "docker-101", "Again", &db, &tx)
            .await
            .is_err());
    }
}
