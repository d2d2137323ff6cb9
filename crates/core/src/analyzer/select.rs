//! Choosing between scored candidates.

use serde::Serialize;

use super::issues::{counts, Issue};
use super::repair::RepairOutcome;

/// A scored SQL string competing for acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub sql: String,
    pub blockers: u32,
    pub warnings: u32,
    pub applied_rules: Vec<String>,
    pub remaining_issues: Vec<Issue>,
}

impl Candidate {
    /// Scores `sql` by the given issues.
    pub fn new(sql: impl Into<String>, applied_rules: Vec<String>, issues: Vec<Issue>) -> Self {
        let (blockers, warnings) = counts(&issues);
        Self {
            sql: sql.into(),
            blockers,
            warnings,
            applied_rules,
            remaining_issues: issues,
        }
    }

    /// Scores a repair outcome with its remaining detector issues.
    pub fn from_outcome(outcome: RepairOutcome) -> Self {
        Self::new(outcome.sql, outcome.applied, outcome.remaining_issues)
    }

    /// Comparison key, lower is better.
    pub fn score(&self) -> (u32, u32) {
        (self.blockers, self.warnings)
    }

    pub fn is_clean(&self) -> bool {
        self.blockers == 0
    }
}

/// Picks the better candidate. Ties keep `a`.
pub fn select(a: Candidate, b: Candidate) -> Candidate {
    if b.score() < a.score() {
        b
    } else {
        a
    }
}

/// Folds [`select`] over the candidates from left to right.
pub fn select_best(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    candidates.into_iter().reduce(select)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(sql: &str, blockers: u32, warnings: u32) -> Candidate {
        Candidate {
            sql: sql.to_string(),
            blockers,
            warnings,
            applied_rules: Vec::new(),
            remaining_issues: Vec::new(),
        }
    }

    #[test]
    fn test_blockers_dominate_warnings() {
        let a = scored("a", 1, 5);
        let b = scored("b", 0, 50);
        assert_eq!(select(a.clone(), b.clone()).sql, "b");
        assert_eq!(select(b, a).sql, "b");
    }

    #[test]
    fn test_ties_keep_first() {
        let a = scored("a", 0, 1);
        let b = scored("b", 0, 1);
        assert_eq!(select(a.clone(), b.clone()).sql, "a");
        assert_eq!(select(b, a).sql, "b");
    }

    #[test]
    fn test_select_best() {
        let best = select_best(vec![scored("a", 2, 0), scored("b", 0, 3), scored("c", 0, 3)]);
        assert_eq!(best.map(|c| c.sql).as_deref(), Some("b"));
        assert!(select_best(Vec::new()).is_none());
    }
}
