// analyzer/mod.rs
//! Static verification and repair of candidate SQL queries.
//!
//! The analyzer checks a candidate query against a schema catalog, repairs
//! the defects it can fix mechanically, and audits the result against the
//! question it is meant to answer. Nothing here performs I/O; every function
//! is a pure computation over its inputs.
//!
//! # Architecture
//!
//! The analyzer is divided into several key components:
//!
//! - [`context`]: The schema catalog and the providers that hand out snapshots
//! - [`query`]: Parsed query facts built on `sqlparser`
//! - [`alias`]: Table/alias resolution over a parsed query
//! - [`detect`]: The issue detector
//! - [`repair`]: The bounded fixed-point repair engine and its rules
//! - [`coverage`]: The question-aware coverage audit
//! - [`select`]: Candidate scoring and selection
//! - [`sanitize`] and [`suggest`]: Model-output cleanup and regeneration hints

pub mod alias;
pub mod context;
pub mod coverage;
pub mod detect;
pub mod distance;
pub mod error;
pub mod issues;
pub mod query;
pub mod repair;
pub mod sanitize;
pub mod select;
pub mod suggest;

use serde::Serialize;

use context::SchemaCatalog;
use coverage::{audit, lint, CoverageReport};
use issues::{dedup, Issue};
use repair::RepairEngine;
use select::{select, Candidate};

/// Final judgement on a candidate query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub candidate: Candidate,
    pub coverage: CoverageReport,
    /// No blockers and full coverage
    pub accepted: bool,
    /// Regeneration hints for the remaining issues
    pub hints: Vec<String>,
}

/// Detector, schema and question lints over one query.
pub fn full_analysis(catalog: &SchemaCatalog, question: &str, sql: &str) -> Vec<Issue> {
    dedup(
        detect::analyze(sql, catalog)
            .into_iter()
            .chain(lint(question, sql)),
    )
}

/// Repairs, analyzes and audits one candidate.
///
/// The repaired text is kept unless the untouched input scores strictly
/// better, so repair never makes a candidate worse.
///
/// # Arguments
/// * `catalog` - Schema snapshot to validate against
/// * `question` - The natural-language question the SQL should answer
/// * `sql` - Candidate SQL text
/// * `limit` - Row cap appended when the query has no LIMIT
pub fn verify(catalog: &SchemaCatalog, question: &str, sql: &str, limit: u32) -> Verdict {
    let outcome = RepairEngine::new(limit).apply(sql);
    let changed = outcome.changed();
    let repaired_issues = full_analysis(catalog, question, &outcome.sql);
    let repaired = Candidate::new(outcome.sql, outcome.applied, repaired_issues);

    let candidate = if changed {
        let original = Candidate::new(sql, Vec::new(), full_analysis(catalog, question, sql));
        select(repaired, original)
    } else {
        repaired
    };

    let coverage = audit(question, &candidate.sql);
    let accepted = candidate.is_clean() && coverage.ok;
    let hints = suggest::repair_hints(&candidate.remaining_issues, catalog);
    tracing::debug!(
        accepted,
        blockers = candidate.blockers,
        warnings = candidate.warnings,
        coverage_ok = coverage.ok,
        "candidate verified"
    );

    Verdict {
        candidate,
        coverage,
        accepted,
        hints,
    }
}

/// Verifies every attempt and keeps the best by `(blockers, warnings)`,
/// earlier attempts winning ties.
pub fn verify_all<'a>(
    catalog: &SchemaCatalog,
    question: &str,
    sqls: impl IntoIterator<Item = &'a str>,
    limit: u32,
) -> Option<Verdict> {
    sqls.into_iter()
        .map(|sql| verify(catalog, question, sql, limit))
        .reduce(|best, next| {
            if next.candidate.score() < best.candidate.score() {
                next
            } else {
                best
            }
        })
}
