pub use crate::analyzer::{
    context::{SchemaCatalog, SchemaCatalogProvider, StaticCatalog},
    coverage::{audit, lint, CoverageReport},
    detect::{analyze, detect, validate_schema},
    error::{AnalyzerError, AnalyzerResult},
    issues::{Issue, IssueKind, Severity},
    query::ParsedQuery,
    repair::{repair, rules::Rule, RepairEngine, RepairOutcome},
    sanitize::{extract_sql, sanitize},
    select::{select, select_best, Candidate},
    suggest::{repair_hints, suggest_tables},
    verify, verify_all, Verdict,
};
