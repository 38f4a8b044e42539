//! Sibling ordering.
//!
//! The resequencer is the only writer of `sequence_order` once a row exists.
//! Every pass loads the complete sibling set (all modules of a course, or all
//! items of a module), decides the final order, and writes 1..N inside a single
//! transaction so readers never observe a half-renumbered set.

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::model::ItemRef;
use crate::storage::entity::{course_module, module_item};
use crate::storage::repository::{CourseRepository, ModuleItemRepository, ModuleRepository};
use log::{debug, info};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceScope {
    Course(i32),
    Module(i32),
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceScope::Course(id) => write!(f, "course#{}", id),
            SequenceScope::Module(id) => write!(f, "module#{}", id),
        }
    }
}

/// Read-only density check of one sibling set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub scope: SequenceScope,
    pub total: usize,
    /// Positions in 1..=total that nobody occupies.
    pub gaps: Vec<i32>,
    /// Positions held by more than one sibling.
    pub duplicates: Vec<i32>,
    /// Positions outside 1..=total.
    pub out_of_range: Vec<i32>,
}

impl SequenceReport {
    pub fn is_dense(&self) -> bool {
        self.gaps.is_empty() && self.duplicates.is_empty() && self.out_of_range.is_empty()
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dense() {
            return write!(f, "{}: {} siblings, dense", self.scope, self.total);
        }
        write!(f, "{}: {} siblings", self.scope, self.total)?;
        if !self.gaps.is_empty() {
            write!(f, ", gaps {:?}", self.gaps)?;
        }
        if !self.duplicates.is_empty() {
            write!(f, ", duplicates {:?}", self.duplicates)?;
        }
        if !self.out_of_range.is_empty() {
            write!(f, ", out of range {:?}", self.out_of_range)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourseResequence {
    pub modules_moved: usize,
    pub items_moved: usize,
}

/// Analyses positions of a sibling set. Input order does not matter.
pub fn analyze_positions(scope: SequenceScope, positions: &[i32]) -> SequenceReport {
    let total = positions.len();
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut out_of_range = Vec::new();
    for &p in positions {
        if (p < 1 || p as usize > total) && !out_of_range.contains(&p) {
            out_of_range.push(p);
        }
        if !seen.insert(p) && !duplicates.contains(&p) {
            duplicates.push(p);
        }
    }
    let gaps = (1..=total as i32).filter(|p| !seen.contains(p)).collect();
    duplicates.sort_unstable();
    out_of_range.sort_unstable();
    SequenceReport {
        scope,
        total,
        gaps,
        duplicates,
        out_of_range,
    }
}

/// Puts the `wanted` ids first in the given order and keeps the rest in their
/// current relative order. `current` must already be sorted by position.
fn arrange(current: &[i32], wanted: &[i32]) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(current.len());
    for id in wanted {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    for id in current {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// `(id, new_position)` for every sibling whose position changes.
fn dense_moves(ordered: &[(i32, i32)]) -> Vec<(i32, i32)> {
    ordered
        .iter()
        .enumerate()
        .filter_map(|(i, &(id, current))| {
            let wanted = i as i32 + 1;
            (current != wanted).then_some((id, wanted))
        })
        .collect()
}

fn module_positions(modules: &[course_module::Model]) -> Vec<(i32, i32)> {
    modules.iter().map(|m| (m.id, m.sequence_order)).collect()
}

fn item_positions(items: &[module_item::Model]) -> Vec<(i32, i32)> {
    items.iter().map(|i| (i.id, i.sequence_order)).collect()
}

fn in_order(positions: &[(i32, i32)], ids: &[i32]) -> Vec<(i32, i32)> {
    ids.iter()
        .filter_map(|id| positions.iter().find(|(pid, _)| pid == id).copied())
        .collect()
}

pub struct Resequencer;

impl Resequencer {
    /// 按当前 (sequence_order, id) 将课程下模块重排为 1..N，返回改动行数
    pub async fn resequence_modules(db: &DatabaseConnection, course_id: i32) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        CourseRepository::get(&txn, course_id).await?;
        let modules = ModuleRepository::list_for_course(&txn, course_id).await?;
        let moves = dense_moves(&module_positions(&modules));
        for &(id, position) in &moves {
            ModuleRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        if !moves.is_empty() {
            info!(
                "resequenced modules of course {}: {} of {} moved",
                course_id,
                moves.len(),
                modules.len()
            );
        }
        Ok(moves.len())
    }

    pub async fn resequence_items(db: &DatabaseConnection, module_id: i32) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        ModuleRepository::get(&txn, module_id).await?;
        let items = ModuleItemRepository::items_for_module(&txn, module_id).await?;
        let moves = dense_moves(&item_positions(&items));
        for &(id, position) in &moves {
            ModuleItemRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        if !moves.is_empty() {
            info!(
                "resequenced items of module {}: {} of {} moved",
                module_id,
                moves.len(),
                items.len()
            );
        }
        Ok(moves.len())
    }

    /// Listed modules first in the given order, the rest after them in their
    /// current relative order. Unknown slugs fail before anything is written.
    pub async fn reorder_modules(
        db: &DatabaseConnection,
        course_id: i32,
        slugs: &[String],
    ) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        CourseRepository::get(&txn, course_id).await?;
        let modules = ModuleRepository::list_for_course(&txn, course_id).await?;

        let mut wanted = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let module = modules
                .iter()
                .find(|m| &m.slug == slug)
                .ok_or_else(|| CatalogError::not_found("course_module", slug))?;
            wanted.push(module.id);
        }

        let positions = module_positions(&modules);
        let current: Vec<i32> = modules.iter().map(|m| m.id).collect();
        let ordered = in_order(&positions, &arrange(&current, &wanted));
        let moves = dense_moves(&ordered);
        for &(id, position) in &moves {
            ModuleRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        info!(
            "reordered course {}: {} modules, {} moved",
            course_id,
            modules.len(),
            moves.len()
        );
        Ok(moves.len())
    }

    pub async fn reorder_items(
        db: &DatabaseConnection,
        module_id: i32,
        order: &[ItemRef],
    ) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        ModuleRepository::get(&txn, module_id).await?;
        let items = ModuleItemRepository::items_for_module(&txn, module_id).await?;

        let mut wanted = Vec::with_capacity(order.len());
        for item in order {
            let link = items
                .iter()
                .find(|l| l.item_ref() == Some(*item))
                .ok_or_else(|| CatalogError::not_found("module_item", item))?;
            wanted.push(link.id);
        }

        let positions = item_positions(&items);
        let current: Vec<i32> = items.iter().map(|i| i.id).collect();
        let ordered = in_order(&positions, &arrange(&current, &wanted));
        let moves = dense_moves(&ordered);
        for &(id, position) in &moves {
            ModuleItemRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        info!(
            "reordered module {}: {} items, {} moved",
            module_id,
            items.len(),
            moves.len()
        );
        Ok(moves.len())
    }

    /// 删除模块（连同其条目）后重排剩余模块
    pub async fn remove_module(
        db: &DatabaseConnection,
        course_id: i32,
        slug: &str,
    ) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        let module = ModuleRepository::get_by_slug(&txn, course_id, slug).await?;
        ModuleRepository::delete(&txn, module.id).await?;

        let survivors = ModuleRepository::list_for_course(&txn, course_id).await?;
        let moves = dense_moves(&module_positions(&survivors));
        for &(id, position) in &moves {
            ModuleRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        info!(
            "removed module {} from course {}; {} remaining",
            slug,
            course_id,
            survivors.len()
        );
        Ok(moves.len())
    }

    pub async fn remove_item(
        db: &DatabaseConnection,
        module_id: i32,
        item: ItemRef,
    ) -> CatalogResult<usize> {
        let txn = db.begin().await?;
        if !ModuleItemRepository::unlink(&txn, module_id, item).await? {
            return Err(CatalogError::not_found("module_item", item));
        }

        let survivors = ModuleItemRepository::items_for_module(&txn, module_id).await?;
        let moves = dense_moves(&item_positions(&survivors));
        for &(id, position) in &moves {
            ModuleItemRepository::set_sequence(&txn, id, position).await?;
        }
        txn.commit().await?;

        info!("removed {} from module {}", item, module_id);
        Ok(moves.len())
    }

    /// Modules of the course, then the items of every module.
    pub async fn resequence_course(
        db: &DatabaseConnection,
        course_id: i32,
    ) -> CatalogResult<CourseResequence> {
        let modules_moved = Self::resequence_modules(db, course_id).await?;
        let mut items_moved = 0;
        for module in ModuleRepository::list_for_course(db, course_id).await? {
            items_moved += Self::resequence_items(db, module.id).await?;
        }
        debug!(
            "course {} resequenced: modules_moved={}, items_moved={}",
            course_id, modules_moved, items_moved
        );
        Ok(CourseResequence {
            modules_moved,
            items_moved,
        })
    }

    pub async fn density(
        db: &DatabaseConnection,
        scope: SequenceScope,
    ) -> CatalogResult<SequenceReport> {
        let positions: Vec<i32> = match scope {
            SequenceScope::Course(id) => ModuleRepository::list_for_course(db, id)
                .await?
                .iter()
                .map(|m| m.sequence_order)
                .collect(),
            SequenceScope::Module(id) => ModuleItemRepository::items_for_module(db, id)
                .await?
                .iter()
                .map(|i| i.sequence_order)
                .collect(),
        };
        Ok(analyze_positions(scope, &positions))
    }
}
