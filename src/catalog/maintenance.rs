use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::{CertificationTrack, ItemRef, ModuleDefinition, Upserted};
use crate::catalog::sequencing::{Resequencer, SequenceReport, SequenceScope};
use crate::catalog::slug::is_valid_slug;
use crate::storage::entity::{course, course_module, module_item, CourseModule, ModuleItem};
use crate::storage::repository::{
    ContentCounts, ContentRepository, CourseRepository, ModuleItemRepository, ModuleRepository,
};
use log::{info, warn};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CloneSummary {
    pub course: course::Model,
    pub modules: usize,
    pub links: usize,
}

/// 复制课程结构：新课程与新模块，条目仍指向原有内容行
pub async fn clone_course(
    db: &DatabaseConnection,
    source_slug: &str,
    new_slug: &str,
    new_title: &str,
) -> CatalogResult<CloneSummary> {
    let source = CourseRepository::get_by_slug(db, source_slug).await?;
    if !is_valid_slug(new_slug) {
        return Err(CatalogError::validation(
            "course",
            "slug",
            format!("'{}' must be lowercase words joined by single hyphens", new_slug),
        ));
    }
    if CourseRepository::find_by_slug(db, new_slug).await?.is_some() {
        return Err(CatalogError::validation(
            "course",
            "slug",
            format!("'{}' is already taken", new_slug),
        ));
    }

    let mut def = crate::catalog::model::CourseDefinition::new(new_slug, new_title);
    def.description = source.description.clone();
    def.difficulty_level = source.difficulty_level.clone();
    def.estimated_hours = source.estimated_hours;
    def.certification_track = source.certification_track.clone();
    def.published = false;
    def.sequence_order = source.sequence_order;
    def.learning_objectives = serde_json::from_str(&source.learning_objectives).unwrap_or_default();
    def.prerequisites = serde_json::from_str(&source.prerequisites).unwrap_or_default();
    // 源课程里可能残留非法的认证方向
    crate::catalog::validation::repair_certification_track(&mut def);

    let txn = db.begin().await?;
    let course = CourseRepository::find_or_create(&txn, &def).await?.into_inner();

    let mut modules = 0;
    let mut links = 0;
    for module in ModuleRepository::list_for_course(&txn, source.id).await? {
        let module_def = ModuleDefinition {
            slug: Some(module.slug.clone()),
            title: module.title.clone(),
            description: module.description.clone(),
            sequence_order: Some(module.sequence_order),
            estimated_minutes: module.estimated_minutes,
            learning_objectives: serde_json::from_str(&module.learning_objectives)
                .unwrap_or_default(),
            published: module.published,
        };
        let copy = ModuleRepository::find_or_create(&txn, course.id, &module_def)
            .await?
            .into_inner();
        modules += 1;

        for link in ModuleItemRepository::items_for_module(&txn, module.id).await? {
            let Some(item) = link.item_ref() else {
                warn!("skipping link {} with unknown type {}", link.id, link.item_type);
                continue;
            };
            if let Upserted::Created(_) = ModuleItemRepository::link(
                &txn,
                copy.id,
                item,
                link.sequence_order,
                link.required,
            )
            .await?
            {
                links += 1;
            }
        }
    }
    txn.commit().await?;

    info!(
        "cloned course {} -> {} ({} modules, {} links)",
        source_slug, new_slug, modules, links
    );
    Ok(CloneSummary {
        course,
        modules,
        links,
    })
}

// 空串同样不在允许列表中
fn stored_track_is_valid(track: &str) -> bool {
    track.parse::<CertificationTrack>().is_ok()
}

/// Clears stored tracks outside the allow-list. Returns the repaired slugs.
pub async fn fix_certification_tracks(db: &DatabaseConnection) -> CatalogResult<Vec<String>> {
    let mut repaired = Vec::new();
    for course in CourseRepository::list(db).await? {
        let Some(track) = course.certification_track.as_deref() else {
            continue;
        };
        if stored_track_is_valid(track) {
            continue;
        }
        warn!(
            "course {} has invalid certification track '{}', clearing",
            course.slug, track
        );
        CourseRepository::set_certification_track(db, course.id, None).await?;
        repaired.push(course.slug);
    }
    Ok(repaired)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingReason {
    UnknownType(String),
    MissingContent(ItemRef),
    MissingModule(i32),
}

impl fmt::Display for DanglingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReason::UnknownType(t) => write!(f, "unknown item type '{}'", t),
            DanglingReason::MissingContent(item) => write!(f, "{} does not exist", item),
            DanglingReason::MissingModule(id) => write!(f, "module#{} does not exist", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingLink {
    pub link_id: i32,
    pub module_id: i32,
    pub reason: DanglingReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub courses: usize,
    pub modules: usize,
    pub links: usize,
    pub dangling: Vec<DanglingLink>,
    /// Only sibling sets that are not dense.
    pub sequence_issues: Vec<SequenceReport>,
    pub invalid_tracks: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.sequence_issues.is_empty() && self.invalid_tracks.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!(
            "{} courses, {} modules, {} links",
            self.courses, self.modules, self.links
        )];
        if self.is_clean() {
            out.push("✓ catalog is consistent".to_string());
            return out;
        }
        for d in &self.dangling {
            out.push(format!(
                "✗ link#{} in module#{}: {}",
                d.link_id, d.module_id, d.reason
            ));
        }
        for s in &self.sequence_issues {
            out.push(format!("⚠ {}", s));
        }
        for slug in &self.invalid_tracks {
            out.push(format!("⚠ course {} has an invalid certification track", slug));
        }
        out
    }
}

/// 全库一致性检查：悬空链接、排序密度、非法认证方向。只读。
pub async fn audit(db: &DatabaseConnection) -> CatalogResult<AuditReport> {
    let courses = CourseRepository::list(db).await?;
    let mut report = AuditReport {
        courses: courses.len(),
        ..Default::default()
    };

    let mut module_ids = HashSet::new();
    for course in &courses {
        if let Some(track) = course.certification_track.as_deref() {
            if !stored_track_is_valid(track) {
                report.invalid_tracks.push(course.slug.clone());
            }
        }

        let modules = ModuleRepository::list_for_course(db, course.id).await?;
        report.modules += modules.len();
        let density = Resequencer::density(db, SequenceScope::Course(course.id)).await?;
        if !density.is_dense() {
            report.sequence_issues.push(density);
        }
        for module in modules {
            module_ids.insert(module.id);
            let density = Resequencer::density(db, SequenceScope::Module(module.id)).await?;
            if !density.is_dense() {
                report.sequence_issues.push(density);
            }
        }
    }

    let links = ModuleItemRepository::all(db).await?;
    report.links = links.len();
    for link in links {
        let reason = if !module_ids.contains(&link.course_module_id) {
            Some(DanglingReason::MissingModule(link.course_module_id))
        } else {
            match link.item_ref() {
                None => Some(DanglingReason::UnknownType(link.item_type.clone())),
                Some(item) if !ContentRepository::exists(db, item).await? => {
                    Some(DanglingReason::MissingContent(item))
                }
                Some(_) => None,
            }
        };
        if let Some(reason) = reason {
            report.dangling.push(DanglingLink {
                link_id: link.id,
                module_id: link.course_module_id,
                reason,
            });
        }
    }

    Ok(report)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub courses: u64,
    pub modules: u64,
    pub links: u64,
    pub content: ContentCounts,
}

impl CatalogStats {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("courses:   {}", self.courses),
            format!("modules:   {}", self.modules),
            format!("links:     {}", self.links),
            format!("lessons:   {}", self.content.lessons),
            format!(
                "quizzes:   {} ({} questions)",
                self.content.quizzes, self.content.questions
            ),
            format!("labs:      {}", self.content.labs),
            format!("units:     {}", self.content.units),
        ]
    }
}

pub async fn catalog_stats(db: &DatabaseConnection) -> CatalogResult<CatalogStats> {
    Ok(CatalogStats {
        courses: crate::storage::entity::Course::find().count(db).await?,
        modules: CourseModule::find().count(db).await?,
        links: ModuleItem::find().count(db).await?,
        content: ContentRepository::counts(db).await?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineItem {
    pub link: module_item::Model,
    /// `None` when the link points at a missing row.
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineModule {
    pub module: course_module::Model,
    pub items: Vec<OutlineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseOutline {
    pub course: course::Model,
    pub modules: Vec<OutlineModule>,
}

impl CourseOutline {
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!("{} ({})", self.course.title, self.course.slug)];
        for m in &self.modules {
            out.push(format!(
                "{:>3}. {} [{}]",
                m.module.sequence_order, m.module.title, m.module.slug
            ));
            for item in &m.items {
                let label = item
                    .link
                    .item_ref()
                    .map(|r| r.kind.label())
                    .unwrap_or("?");
                let title = item.title.as_deref().unwrap_or("<missing>");
                let optional = if item.link.required { "" } else { " (optional)" };
                out.push(format!(
                    "       {:>3}. {:<6} {}{}",
                    item.link.sequence_order, label, title, optional
                ));
            }
        }
        out
    }
}

pub async fn course_outline(db: &DatabaseConnection, slug: &str) -> CatalogResult<CourseOutline> {
    let course = CourseRepository::get_by_slug(db, slug).await?;
    let mut modules = Vec::new();
    for module in ModuleRepository::list_for_course(db, course.id).await? {
        let mut items = Vec::new();
        for link in ModuleItemRepository::items_for_module(db, module.id).await? {
            let title = match link.item_ref() {
                Some(item) => ContentRepository::find(db, item)
                    .await?
                    .map(|c| c.title().to_string()),
                None => None,
            };
            items.push(OutlineItem { link, title });
        }
        modules.push(OutlineModule { module, items });
    }
    Ok(CourseOutline { course, modules })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{CourseDefinition, LabDefinition, LessonDefinition};
    use crate::storage::entity::course::ActiveModel as CourseActiveModel;
    use crate::storage::memory_db;
    use sea_orm::{ActiveModelTrait, Set};

    async fn seeded(db: &DatabaseConnection) -> (i32, i32, ItemRef, ItemRef) {
        let course = CourseRepository::find_or_create(
            db,
            &CourseDefinition::new("docker-fundamentals", "Docker Fundamentals"),
        )
        .await
        .unwrap()
        .into_inner();
        let module = ModuleRepository::find_or_create(
            db,
            course.id,
            &ModuleDefinition::new("containers", "Containers"),
        )
        .await
        .unwrap()
        .into_inner();
        let lesson =
            ContentRepository::find_or_create_lesson(db, &LessonDefinition::new("What is Docker?"))
                .await
                .unwrap()
                .into_inner();
        let lab = ContentRepository::find_or_create_lab(
            db,
            &LabDefinition::new("first-container", "First Container"),
        )
        .await
        .unwrap()
        .into_inner();
        let lesson = ItemRef::lesson(lesson.id);
        let lab = ItemRef::lab(lab.id);
        ModuleItemRepository::link(db, module.id, lesson, 1, true)
            .await
            .unwrap();
        ModuleItemRepository::link(db, module.id, lab, 2, false)
            .await
            .unwrap();
        (course.id, module.id, lesson, lab)
    }

    #[tokio::test]
    async fn clone_shares_content_rows() {
        let db = memory_db().await;
        seeded(&db).await;
        let before = ContentRepository::counts(&db).await.unwrap();

        let summary = clone_course(&db, "docker-fundamentals", "docker-bootcamp", "Docker Bootcamp")
            .await
            .unwrap();
        assert_eq!(summary.modules, 1);
        assert_eq!(summary.links, 2);
        assert!(!summary.course.published);
        assert_eq!(ContentRepository::counts(&db).await.unwrap(), before);

        let outline = course_outline(&db, "docker-bootcamp").await.unwrap();
        let titles: Vec<_> = outline.modules[0]
            .items
            .iter()
            .map(|i| i.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["What is Docker?", "First Container"]);

        let err = clone_course(&db, "docker-fundamentals", "docker-bootcamp", "Again")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn fix_tracks_clears_invalid_values() {
        let db = memory_db().await;
        let (course_id, ..) = seeded(&db).await;
        // 绕过校验直接写入历史脏数据
        CourseActiveModel {
            id: Set(course_id),
            certification_track: Set(Some("python".to_string())),
            ..Default::default()
        }
        .update(&db)
        .await
        .unwrap();

        let report = audit(&db).await.unwrap();
        assert_eq!(report.invalid_tracks, vec!["docker-fundamentals".to_string()]);

        let repaired = fix_certification_tracks(&db).await.unwrap();
        assert_eq!(repaired, vec!["docker-fundamentals".to_string()]);
        let course = CourseRepository::get(&db, course_id).await.unwrap();
        assert_eq!(course.certification_track, None);
        assert!(fix_certification_tracks(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fix_tracks_clears_blank_values() {
        let db = memory_db().await;
        let (course_id, ..) = seeded(&db).await;
        CourseActiveModel {
            id: Set(course_id),
            certification_track: Set(Some("  ".to_string())),
            ..Default::default()
        }
        .update(&db)
        .await
        .unwrap();

        let report = audit(&db).await.unwrap();
        assert_eq!(report.invalid_tracks, vec!["docker-fundamentals".to_string()]);

        let repaired = fix_certification_tracks(&db).await.unwrap();
        assert_eq!(repaired, vec!["docker-fundamentals".to_string()]);
        let course = CourseRepository::get(&db, course_id).await.unwrap();
        assert_eq!(course.certification_track, None);
        assert!(audit(&db).await.unwrap().invalid_tracks.is_empty());
    }

    #[tokio::test]
    async fn audit_finds_dangling_links_and_gaps() {
        let db = memory_db().await;
        let (_, module_id, _, lab) = seeded(&db).await;
        assert!(audit(&db).await.unwrap().is_clean());

        crate::storage::entity::HandsOnLab::delete_by_id(lab.id)
            .exec(&db)
            .await
            .unwrap();
        let report = audit(&db).await.unwrap();
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(report.dangling[0].module_id, module_id);
        assert_eq!(report.dangling[0].reason, DanglingReason::MissingContent(lab));

        ModuleItemRepository::unlink(&db, module_id, lab).await.unwrap();
        let lesson = ContentRepository::find_or_create_lesson(&db, &LessonDefinition::new("Extra"))
            .await
            .unwrap()
            .into_inner();
        ModuleItemRepository::link(&db, module_id, ItemRef::lesson(lesson.id), 5, true)
            .await
            .unwrap();
        let report = audit(&db).await.unwrap();
        assert!(report.dangling.is_empty());
        assert_eq!(report.sequence_issues.len(), 1);
        assert_eq!(report.sequence_issues[0].scope, SequenceScope::Module(module_id));
    }

    #[tokio::test]
    async fn stats_and_outline() {
        let db = memory_db().await;
        seeded(&db).await;
        let stats = catalog_stats(&db).await.unwrap();
        assert_eq!(stats.courses, 1);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.content.labs, 1);

        let lines = course_outline(&db, "docker-fundamentals").await.unwrap().lines();
        assert!(lines[0].contains("Docker Fundamentals"));
        assert!(lines.iter().any(|l| l.contains("lab") && l.contains("(optional)")));
        assert!(course_outline(&db, "missing").await.unwrap_err().is_not_found());
    }
}
