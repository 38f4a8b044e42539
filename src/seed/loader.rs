use crate::catalog::error::{CatalogError, CatalogResult};
use crate::seed::manifest::{discover_manifests, ManifestFormat};
use crate::seed::report::{LoadReport, UnitOutcome};
use crate::seed::unit::{LoadMode, ManifestUnit, SeedContext, SeedUnit};
use log::{error, info};
use sea_orm::DatabaseConnection;
use std::path::Path;
use std::time::Instant;

/// Causes kept from an error chain.
const TRACE_DEPTH: usize = 3;

/// Runs seed units one after another. A failing unit is recorded and the
/// loader moves on; whatever the unit wrote before failing stays in place.
pub struct BulkLoader<'a> {
    db: &'a DatabaseConnection,
    mode: LoadMode,
}

impl<'a> BulkLoader<'a> {
    pub fn new(db: &'a DatabaseConnection, mode: LoadMode) -> Self {
        Self { db, mode }
    }

    pub async fn run(&self, units: &[Box<dyn SeedUnit>]) -> LoadReport {
        let mut report = LoadReport::default();
        for unit in units {
            let name = unit.name();
            info!("▶ seeding {}", name);
            let started = Instant::now();
            let mut ctx = SeedContext::new(self.db, self.mode);
            let result = unit.run(&mut ctx).await;
            let elapsed_ms = started.elapsed().as_millis();

            let outcome = match result {
                Ok(()) => {
                    info!("✓ {} ({} ms) {}", name, elapsed_ms, ctx.stats);
                    UnitOutcome {
                        name,
                        ok: true,
                        elapsed_ms,
                        error: None,
                        trace: Vec::new(),
                        stats: ctx.stats,
                    }
                }
                Err(e) => {
                    error!("✗ {} failed: {:#}", name, e);
                    UnitOutcome {
                        name,
                        ok: false,
                        elapsed_ms,
                        error: Some(e.to_string()),
                        trace: e
                            .chain()
                            .skip(1)
                            .take(TRACE_DEPTH)
                            .map(|c| c.to_string())
                            .collect(),
                        stats: ctx.stats,
                    }
                }
            };
            report.units.push(outcome);
        }
        info!(
            "load finished: {} passed, {} failed",
            report.passed(),
            report.failed()
        );
        report
    }

    /// Loads one manifest file, or every manifest under a directory in path order.
    pub async fn load_path(&self, path: &Path) -> CatalogResult<LoadReport> {
        let paths = if path.is_dir() {
            discover_manifests(path)?
        } else if ManifestFormat::from_path(path).is_some() {
            vec![path.to_path_buf()]
        } else {
            return Err(CatalogError::Manifest(format!(
                "not a manifest file or directory: {}",
                path.display()
            )));
        };
        let units: Vec<Box<dyn SeedUnit>> = paths
            .into_iter()
            .map(|p| Box::new(ManifestUnit::new(p)) as Box<dyn SeedUnit>)
            .collect();
        Ok(self.run(&units).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{CourseDefinition, ItemRef, LessonDefinition, ModuleDefinition};
    use crate::storage::memory_db;
    use crate::storage::repository::{CourseRepository, ModuleItemRepository};
    use anyhow::Context;
    use async_trait::async_trait;

    /// Programmatic seed: the docker-fundamentals course with one linked lesson.
    struct DockerFundamentals;

    #[async_trait]
    impl SeedUnit for DockerFundamentals {
        fn name(&self) -> String {
            "docker_fundamentals".to_string()
        }

        async fn run(&self, ctx: &mut SeedContext<'_>) -> anyhow::Result<()> {
            let mut def = CourseDefinition::new("docker-fundamentals", "Docker Fundamentals");
            def.difficulty_level = Some("beginner".to_string());
            def.certification_track = Some("docker".to_string());
            let course = ctx.course(&def).await?;
            let module = ctx
                .module(course.id, &ModuleDefinition::new("containers", "Containers").at(1))
                .await?;
            let lesson = ctx.lesson(&LessonDefinition::new("What is Docker?")).await?;
            ctx.link(module.id, lesson, Some(1), true).await?;
            Ok(())
        }
    }

    /// Writes a course, then fails while linking.
    struct BrokenHalfway;

    #[async_trait]
    impl SeedUnit for BrokenHalfway {
        fn name(&self) -> String {
            "broken".to_string()
        }

        async fn run(&self, ctx: &mut SeedContext<'_>) -> anyhow::Result<()> {
            let course = ctx
                .course(&CourseDefinition::new("half-done", "Half Done"))
                .await?;
            let module = ctx
                .module(course.id, &ModuleDefinition::new("m", "M"))
                .await?;
            ctx.link(module.id, ItemRef::quiz(404), Some(1), true)
                .await
                .context("linking the final quiz")?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn failure_is_isolated_and_not_rolled_back() {
        let db = memory_db().await;
        let units: Vec<Box<dyn SeedUnit>> = vec![
            Box::new(BrokenHalfway),
            Box::new(DockerFundamentals),
        ];
        let report = BulkLoader::new(&db, LoadMode::CreateOnly).run(&units).await;

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        let broken = &report.units[0];
        assert!(!broken.ok);
        assert_eq!(broken.error.as_deref(), Some("linking the final quiz"));
        assert!(broken.trace.len() <= TRACE_DEPTH);
        assert!(broken.trace.iter().any(|c| c.contains("not found")));
        assert_eq!(broken.stats.courses.created, 1);

        // 失败单元已写入的数据保留
        assert!(CourseRepository::find_by_slug(&db, "half-done")
            .await
            .unwrap()
            .is_some());
        let docker = CourseRepository::get_by_slug(&db, "docker-fundamentals")
            .await
            .unwrap();
        assert_eq!(docker.certification_track.as_deref(), Some("docker"));
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let db = memory_db().await;
        let units: Vec<Box<dyn SeedUnit>> = vec![Box::new(DockerFundamentals)];
        let loader = BulkLoader::new(&db, LoadMode::CreateOnly);

        let first = loader.run(&units).await;
        let second = loader.run(&units).await;
        assert!(first.is_success() && second.is_success());
        assert_eq!(first.totals().created(), 4);
        assert_eq!(second.totals().created(), 0);
        assert_eq!(second.totals().links.existing, 1);

        let course = CourseRepository::get_by_slug(&db, "docker-fundamentals")
            .await
            .unwrap();
        let module = crate::storage::repository::ModuleRepository::get_by_slug(
            &db,
            course.id,
            "containers",
        )
        .await
        .unwrap();
        assert_eq!(
            ModuleItemRepository::items_for_module(&db, module.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn loads_manifest_directory() {
        let db = memory_db().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("01-docker.yml"),
            r#"
course:
  slug: docker-fundamentals
  title: Docker Fundamentals
modules:
  - title: Containers
    lessons:
      - title: What is a Container?
        content: Processes with isolation.
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("02-broken.json"),
            r#"{"course": {"slug": "Bad Slug", "title": "Bad"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("03-garbled.yml"), "course: [not, a, map").unwrap();

        let report = BulkLoader::new(&db, LoadMode::CreateOnly)
            .load_path(dir.path())
            .await
            .unwrap();
        assert_eq!(report.units.len(), 3);
        assert!(report.units[0].ok);
        assert!(!report.units[1].ok);
        assert!(report.units[1].error.as_deref().unwrap().contains("error(s)"));
        assert!(!report.units[2].ok);
        assert!(report.units[2].error.as_deref().unwrap().contains("failed to read"));
        assert_eq!(report.totals().lessons.created, 1);
    }

    #[tokio::test]
    async fn bundled_seeds_load_cleanly() {
        let db = memory_db().await;
        let seeds = Path::new(env!("CARGO_MANIFEST_DIR")).join("seeds");
        let loader = BulkLoader::new(&db, LoadMode::CreateOnly);

        let report = loader.load_path(&seeds).await.unwrap();
        assert!(report.is_success(), "{}", report.render());
        let totals = report.totals();
        assert_eq!(totals.links.created, 6);
        // 共享实验只建一次
        assert_eq!(totals.labs.created, 1);

        let again = loader.load_path(&seeds).await.unwrap();
        assert_eq!(again.totals().created(), 0);
    }
}
