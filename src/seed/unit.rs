use crate::catalog::model::{
    CourseDefinition, ItemKind, ItemRef, LabDefinition, LessonDefinition, ModuleDefinition,
    QuizDefinition, UnitDefinition, Upserted,
};
use crate::seed::manifest::{Manifest, ManifestModule};
use crate::seed::report::SeedStats;
use crate::seed::validate::validate_manifest;
use crate::storage::entity::{course, course_module, module_item};
use crate::storage::repository::{
    ContentRepository, CourseRepository, ModuleItemRepository, ModuleRepository,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Existing rows are left untouched.
    #[default]
    CreateOnly,
    /// Existing rows get the definition's attributes; quiz questions are replaced.
    Update,
}

/// Handle a seed unit writes through. Every write is counted in `stats`.
pub struct SeedContext<'a> {
    pub db: &'a DatabaseConnection,
    pub mode: LoadMode,
    pub stats: SeedStats,
}

impl<'a> SeedContext<'a> {
    pub fn new(db: &'a DatabaseConnection, mode: LoadMode) -> Self {
        Self {
            db,
            mode,
            stats: SeedStats::default(),
        }
    }

    pub async fn course(&mut self, def: &CourseDefinition) -> Result<course::Model> {
        let res = match self.mode {
            LoadMode::CreateOnly => CourseRepository::find_or_create(self.db, def).await,
            LoadMode::Update => CourseRepository::upsert(self.db, def).await,
        }
        .with_context(|| format!("course {}", def.slug))?;
        self.stats.courses.record(res.outcome());
        Ok(res.into_inner())
    }

    pub async fn module(
        &mut self,
        course_id: i32,
        def: &ModuleDefinition,
    ) -> Result<course_module::Model> {
        let res = match self.mode {
            LoadMode::CreateOnly => ModuleRepository::find_or_create(self.db, course_id, def).await,
            LoadMode::Update => ModuleRepository::upsert(self.db, course_id, def).await,
        }
        .with_context(|| format!("module {}", def.natural_slug()))?;
        self.stats.modules.record(res.outcome());
        Ok(res.into_inner())
    }

    pub async fn lesson(&mut self, def: &LessonDefinition) -> Result<ItemRef> {
        let res = match self.mode {
            LoadMode::CreateOnly => ContentRepository::find_or_create_lesson(self.db, def).await,
            LoadMode::Update => ContentRepository::upsert_lesson(self.db, def).await,
        }
        .with_context(|| format!("lesson '{}'", def.title))?;
        self.stats.lessons.record(res.outcome());
        Ok(ItemRef::lesson(res.get().id))
    }

    pub async fn quiz(&mut self, def: &QuizDefinition) -> Result<ItemRef> {
        let res = match self.mode {
            LoadMode::CreateOnly => ContentRepository::find_or_create_quiz(self.db, def).await,
            LoadMode::Update => ContentRepository::upsert_quiz(self.db, def).await,
        }
        .with_context(|| format!("quiz '{}'", def.title))?;
        // 只有新建或更新时才会写题目
        if !matches!(res, Upserted::Existing(_)) {
            self.stats.questions += def.questions.len();
        }
        self.stats.quizzes.record(res.outcome());
        Ok(ItemRef::quiz(res.get().id))
    }

    pub async fn lab(&mut self, def: &LabDefinition) -> Result<ItemRef> {
        let res = match self.mode {
            LoadMode::CreateOnly => ContentRepository::find_or_create_lab(self.db, def).await,
            LoadMode::Update => ContentRepository::upsert_lab(self.db, def).await,
        }
        .with_context(|| format!("lab {}", def.slug))?;
        self.stats.labs.record(res.outcome());
        Ok(ItemRef::lab(res.get().id))
    }

    pub async fn unit(&mut self, def: &UnitDefinition) -> Result<ItemRef> {
        let res = match self.mode {
            LoadMode::CreateOnly => ContentRepository::find_or_create_unit(self.db, def).await,
            LoadMode::Update => ContentRepository::upsert_unit(self.db, def).await,
        }
        .with_context(|| format!("unit {}", def.slug))?;
        self.stats.units.record(res.outcome());
        Ok(ItemRef::unit(res.get().id))
    }

    /// Links at `sequence_order`, or appends when no position is given.
    /// In update mode an existing link takes the new `required` flag; its
    /// position is left to the resequencer.
    pub async fn link(
        &mut self,
        module_id: i32,
        item: ItemRef,
        sequence_order: Option<i32>,
        required: bool,
    ) -> Result<module_item::Model> {
        let mut res = match sequence_order {
            Some(n) => ModuleItemRepository::link(self.db, module_id, item, n, required).await,
            None => ModuleItemRepository::append(self.db, module_id, item, required).await,
        }
        .with_context(|| format!("link {} into module#{}", item, module_id))?;

        if self.mode == LoadMode::Update {
            if let Upserted::Existing(existing) = &res {
                if existing.required != required {
                    let updated =
                        ModuleItemRepository::update_link(self.db, existing.id, None, Some(required))
                            .await
                            .with_context(|| format!("update link {} in module#{}", item, module_id))?;
                    res = Upserted::Updated(updated);
                }
            }
        }
        self.stats.links.record(res.outcome());
        Ok(res.into_inner())
    }

    /// Resolves existing content by kind label and natural key.
    pub async fn existing(&self, kind: &str, key: &str) -> Result<ItemRef> {
        let kind = ItemKind::from_label(kind).ok_or_else(|| anyhow!("unknown item kind '{}'", kind))?;
        let item = ContentRepository::find_by_natural_key(self.db, kind, key)
            .await?
            .ok_or_else(|| anyhow!("shared {} '{}' does not exist", kind.label(), key))?;
        Ok(item.item_ref())
    }
}

/// One independently loadable piece of curriculum.
#[async_trait]
pub trait SeedUnit: Send + Sync {
    fn name(&self) -> String;

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<()>;
}

/// A manifest file on disk, parsed and validated when it runs.
pub struct ManifestUnit {
    path: PathBuf,
}

impl ManifestUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

async fn seed_module(
    ctx: &mut SeedContext<'_>,
    course_id: i32,
    m: &ManifestModule,
) -> Result<()> {
    let module = ctx.module(course_id, &m.module).await?;

    for placed in &m.course_lessons {
        let item = ctx.lesson(&placed.def).await?;
        ctx.link(module.id, item, placed.sequence_order, placed.required)
            .await?;
    }
    for placed in &m.units {
        let item = ctx.unit(&placed.def).await?;
        ctx.link(module.id, item, placed.sequence_order, placed.required)
            .await?;
    }
    for placed in &m.labs {
        let item = ctx.lab(&placed.def).await?;
        ctx.link(module.id, item, placed.sequence_order, placed.required)
            .await?;
    }
    for placed in &m.quizzes {
        let item = ctx.quiz(&placed.def).await?;
        ctx.link(module.id, item, placed.sequence_order, placed.required)
            .await?;
    }
    for shared in &m.shared {
        let item = ctx.existing(&shared.kind, &shared.key).await?;
        ctx.link(module.id, item, shared.sequence_order, shared.required)
            .await?;
    }
    Ok(())
}

/// 按 course → module → item 的依赖顺序写入整份清单
pub async fn seed_manifest(ctx: &mut SeedContext<'_>, manifest: &Manifest) -> Result<()> {
    let report = validate_manifest(manifest);
    for w in &report.warnings {
        warn!("{}: {}", manifest.course.slug, w);
    }
    if !report.is_valid() {
        bail!(
            "manifest for {} has {} error(s): {}",
            manifest.course.slug,
            report.errors.len(),
            report.errors.join("; ")
        );
    }

    let course = ctx.course(&manifest.course).await?;
    for m in &manifest.modules {
        seed_module(ctx, course.id, m)
            .await
            .with_context(|| format!("course {}", course.slug))?;
    }
    info!(
        "course {} seeded: {} modules",
        course.slug,
        manifest.modules.len()
    );
    Ok(())
}

#[async_trait]
impl SeedUnit for ManifestUnit {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<()> {
        let manifest = Manifest::load(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        seed_manifest(ctx, &manifest).await
    }
}
