use crate::app_service::course_summaries;
use crate::app_state::AppEvent;
use crate::catalog::maintenance::{self, catalog_stats, fix_certification_tracks};
use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

pub async fn courses(db: &DatabaseConnection, evt_tx: &mpsc::UnboundedSender<AppEvent>) -> Result<()> {
    let list = course_summaries(db).await.context("无法读取课程列表")?;
    let _ = evt_tx.send(AppEvent::Courses(list));
    Ok(())
}

pub async fn fix_cert_tracks(
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let fixed = fix_certification_tracks(db)
        .await
        .context("修复认证方向失败")?;
    let msg = if fixed.is_empty() {
        "✓ 所有课程的认证方向均合法".to_string()
    } else {
        format!("✓ 已修复 {} 门课程: {}", fixed.len(), fixed.join(", "))
    };
    let _ = evt_tx.send(AppEvent::Message(msg));
    Ok(())
}

pub async fn audit(db: &DatabaseConnection, evt_tx: &mpsc::UnboundedSender<AppEvent>) -> Result<()> {
    let report = maintenance::audit(db).await.context("一致性检查失败")?;
    let _ = evt_tx.send(AppEvent::Audit(report));
    Ok(())
}

pub async fn stats(db: &DatabaseConnection, evt_tx: &mpsc::UnboundedSender<AppEvent>) -> Result<()> {
    let stats = catalog_stats(db).await.context("统计查询失败")?;
    let _ = evt_tx.send(AppEvent::Stats(stats));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::CourseDefinition;
    use crate::storage::entity::course::ActiveModel as CourseActiveModel;
    use crate::storage::memory_db;
    use crate::storage::repository::CourseRepository;
    use sea_orm::{ActiveModelTrait, Set};

    #[tokio::test]
    async fn audit_then_fix_tracks() {
        let db = memory_db().await;
        let course = CourseRepository::find_or_create(
            &db,
            &CourseDefinition::new("python-basics", "Python Basics"),
        )
        .await
        .unwrap()
        .into_inner();
        // 绕过校验直接写入非法值
        CourseActiveModel {
            id: Set(course.id),
            certification_track: Set(Some("python".to_string())),
            ..Default::default()
        }
        .update(&db)
        .await
        .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        audit(&db, &tx).await.unwrap();
        match rx.try_recv().unwrap() {
            AppEvent::Audit(report) => assert_eq!(report.invalid_tracks, vec!["python-basics"]),
            other => panic!("unexpected event {:?}", other),
        }

        fix_cert_tracks(&db, &tx).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Message(m) if m.contains("python-basics")));
        fix_cert_tracks(&db, &tx).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Message(m) if m.contains("均合法")));

        stats(&db, &tx).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Stats(s) if s.courses == 1));
    }
}
