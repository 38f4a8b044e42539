use crate::catalog::model::UpsertOutcome;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub existing: usize,
    pub updated: usize,
}

impl Tally {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Existing => self.existing += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.existing + self.updated
    }

    fn merge(&mut self, other: &Tally) {
        self.created += other.created;
        self.existing += other.existing;
        self.updated += other.updated;
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ={} ~{}",
            self.created, self.existing, self.updated
        )
    }
}

/// Per-entity counts of what a seed run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub courses: Tally,
    pub modules: Tally,
    pub lessons: Tally,
    pub quizzes: Tally,
    pub labs: Tally,
    pub units: Tally,
    pub links: Tally,
    /// Quiz questions written (new quizzes and replaced question sets).
    pub questions: usize,
}

impl SeedStats {
    pub fn merge(&mut self, other: &SeedStats) {
        self.courses.merge(&other.courses);
        self.modules.merge(&other.modules);
        self.lessons.merge(&other.lessons);
        self.quizzes.merge(&other.quizzes);
        self.labs.merge(&other.labs);
        self.units.merge(&other.units);
        self.links.merge(&other.links);
        self.questions += other.questions;
    }

    pub fn is_empty(&self) -> bool {
        *self == SeedStats::default()
    }

    pub fn created(&self) -> usize {
        [
            self.courses,
            self.modules,
            self.lessons,
            self.quizzes,
            self.labs,
            self.units,
            self.links,
        ]
        .iter()
        .map(|t| t.created)
        .sum()
    }
}

impl fmt::Display for SeedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "courses {} | modules {} | lessons {} | quizzes {} ({} questions) | labs {} | units {} | links {}",
            self.courses,
            self.modules,
            self.lessons,
            self.quizzes,
            self.questions,
            self.labs,
            self.units,
            self.links
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub name: String,
    pub ok: bool,
    pub elapsed_ms: u128,
    pub error: Option<String>,
    /// First causes of the error chain.
    pub trace: Vec<String>,
    pub stats: SeedStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub units: Vec<UnitOutcome>,
}

impl LoadReport {
    pub fn passed(&self) -> usize {
        self.units.iter().filter(|u| u.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.units.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn totals(&self) -> SeedStats {
        let mut total = SeedStats::default();
        for unit in &self.units {
            total.merge(&unit.stats);
        }
        total
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.units.iter().map(|u| u.elapsed_ms).sum()
    }

    /// 供终端与日志面板显示的逐行摘要
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.units.len() * 2 + 3);
        for unit in &self.units {
            if unit.ok {
                out.push(format!("✓ {} ({} ms)", unit.name, unit.elapsed_ms));
            } else {
                out.push(format!(
                    "✗ {} ({} ms): {}",
                    unit.name,
                    unit.elapsed_ms,
                    unit.error.as_deref().unwrap_or("unknown error")
                ));
                for cause in &unit.trace {
                    out.push(format!("    caused by: {}", cause));
                }
            }
        }
        out.push(format!(
            "{} units: {} passed, {} failed in {} ms",
            self.units.len(),
            self.passed(),
            self.failed(),
            self.elapsed_ms()
        ));
        out.push(self.totals().to_string());
        out
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, ok: bool, created_courses: usize) -> UnitOutcome {
        let mut stats = SeedStats::default();
        stats.courses.created = created_courses;
        UnitOutcome {
            name: name.to_string(),
            ok,
            elapsed_ms: 5,
            error: (!ok).then(|| "course.slug: can't be blank".to_string()),
            trace: if ok { vec![] } else { vec!["validation failed".to_string()] },
            stats,
        }
    }

    #[test]
    fn report_counts_and_totals() {
        let report = LoadReport {
            units: vec![unit("a.yml", true, 1), unit("b.yml", false, 0), unit("c.yml", true, 2)],
        };
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.totals().courses.created, 3);
        assert_eq!(report.elapsed_ms(), 15);

        let text = report.render();
        assert!(text.contains("✗ b.yml"));
        assert!(text.contains("caused by: validation failed"));
        assert!(text.contains("3 units: 2 passed, 1 failed"));
    }

    #[test]
    fn tally_records_outcomes() {
        let mut t = Tally::default();
        t.record(UpsertOutcome::Created);
        t.record(UpsertOutcome::Existing);
        t.record(UpsertOutcome::Existing);
        assert_eq!(t.total(), 3);
        assert_eq!(t.to_string(), "+1 =2 ~0");
    }
}
