use crate::app_state::AppEvent;
use crate::seed::{discover_manifests, validate_manifest, BulkLoader, LoadMode, Manifest};
use anyhow::{bail, Context, Result};
use sea_orm::DatabaseConnection;
use std::path::Path;
use tokio::sync::mpsc;

pub async fn run(
    path: &Path,
    mode: LoadMode,
    db: &DatabaseConnection,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let _ = evt_tx.send(AppEvent::Log(format!(
        "正在加载 {} ({:?})...",
        path.display(),
        mode
    )));

    let report = BulkLoader::new(db, mode)
        .load_path(path)
        .await
        .with_context(|| format!("无法加载 {}", path.display()))?;

    let failed = report.failed();
    let total = report.units.len();
    let _ = evt_tx.send(AppEvent::Report(report));
    if failed > 0 {
        bail!("{} of {} seed units failed", failed, total);
    }
    Ok(())
}

/// 只做校验，不写库
pub fn validate(path: &Path, evt_tx: &mpsc::UnboundedSender<AppEvent>) -> Result<()> {
    let paths = if path.is_dir() {
        discover_manifests(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut invalid = 0;
    for p in &paths {
        let manifest = match Manifest::load(p) {
            Ok(m) => m,
            Err(e) => {
                invalid += 1;
                let _ = evt_tx.send(AppEvent::Error(format!("✗ {}: {}", p.display(), e)));
                continue;
            }
        };
        let report = validate_manifest(&manifest);
        for w in &report.warnings {
            let _ = evt_tx.send(AppEvent::Warn(format!("⚠ {}: {}", p.display(), w)));
        }
        if report.is_valid() {
            let _ = evt_tx.send(AppEvent::Message(format!("✓ {}", p.display())));
        } else {
            invalid += 1;
            for e in &report.errors {
                let _ = evt_tx.send(AppEvent::Error(format!("✗ {}: {}", p.display(), e)));
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} manifests invalid", invalid, paths.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_db;
    use crate::storage::repository::CourseRepository;

    const DOCKER: &str = r#"
course:
  slug: docker-fundamentals
  title: Docker Fundamentals
  description: Containers from zero
modules:
  - slug: intro
    title: Introduction
    course_lessons:
      - title: What is Docker?
        content: Docker packages applications with their dependencies.
"#;

    #[tokio::test]
    async fn load_sends_report_and_fails_on_bad_units() {
        let db = memory_db().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker.yml"), DOCKER).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        run(dir.path(), LoadMode::CreateOnly, &db, &tx).await.unwrap();
        assert!(CourseRepository::find_by_slug(&db, "docker-fundamentals")
            .await
            .unwrap()
            .is_some());
        let mut saw_report = false;
        while let Ok(evt) = rx.try_recv() {
            if let AppEvent::Report(report) = evt {
                assert!(report.is_success());
                saw_report = true;
            }
        }
        assert!(saw_report);

        std::fs::write(dir.path().join("zz-broken.yml"), "course: {slug: Bad, title: x}").unwrap();
        let err = run(dir.path(), LoadMode::CreateOnly, &db, &tx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 seed units failed");
    }

    #[test]
    fn validate_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yml"), DOCKER).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        validate(dir.path(), &tx).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), AppEvent::Message(m) if m.starts_with("✓")));

        std::fs::write(dir.path().join("b.json"), r#"{"course": {"slug": "", "title": ""}}"#)
            .unwrap();
        assert!(validate(dir.path(), &tx).is_err());
    }
}
